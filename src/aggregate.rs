//! Worker state aggregation.
//!
//! The aggregator owns the canonical in-memory view of all workers. A
//! refresh rebuilds the whole snapshot from scratch and publishes it
//! atomically; readers always see either the previous complete snapshot or
//! the new one, never a half-built mix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use rayon::prelude::*;
use serde::Serialize;

use crate::git::branch::{self, BranchRelationship};
use crate::git::{DirStatus, Repository, Worktree};
use crate::review::{RemoteReviewStatus, StatusCache};

/// Everything the surfaces need to render one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerView {
    /// Directory name of the worktree, used as the display handle.
    pub name: String,
    pub path: std::path::PathBuf,
    pub branch: String,
    pub relationship: BranchRelationship,
    pub dir_status: DirStatus,
    /// First changed path when the worktree is dirty.
    pub activity: Option<String>,
    pub review: RemoteReviewStatus,
}

/// One complete refresh cycle's output. Immutable after publication.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub default_branch: String,
    pub workers: Vec<WorkerView>,
}

/// Shared aggregation engine behind every surface (CLI, monitor, RPC).
pub struct Aggregator {
    repo: Repository,
    cache: StatusCache,
    snapshot: RwLock<Arc<Snapshot>>,
    refreshing: AtomicBool,
}

impl Aggregator {
    pub fn new(repo: Repository) -> Self {
        Self::with_cache(repo, StatusCache::default())
    }

    pub fn with_cache(repo: Repository, cache: StatusCache) -> Self {
        Self {
            repo,
            cache,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Latest published snapshot. Never blocks on an in-flight refresh.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Rebuild and publish a snapshot.
    ///
    /// Coalesces concurrent callers: while one refresh is in flight, other
    /// callers get the previously published snapshot instead of stacking a
    /// second rebuild behind the first.
    pub fn refresh(&self) -> Arc<Snapshot> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return self.snapshot();
        }

        let snapshot = Arc::new(self.collect());
        {
            let mut slot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
            *slot = snapshot.clone();
        }
        self.refreshing.store(false, Ordering::Release);
        snapshot
    }

    fn collect(&self) -> Snapshot {
        let default_branch = self.repo.default_branch();
        let worktrees = self.repo.list_worktrees();
        if worktrees.is_empty() {
            return Snapshot {
                default_branch,
                workers: Vec::new(),
            };
        }

        let workers = worker_worktrees(&worktrees, &default_branch);
        let relationships = branch::relationships(&self.repo, &default_branch);

        let mut views: Vec<WorkerView> = workers
            .par_iter()
            .filter_map(|wt| self.enrich(wt, &relationships))
            .collect();
        views.sort_by(|a, b| a.branch.cmp(&b.branch));

        Snapshot {
            default_branch,
            workers: views,
        }
    }

    /// Build the full view for one worker worktree. Returns `None` for a
    /// record whose branch name fails validation, with a warning; one bad
    /// registration never poisons the rest of the snapshot.
    fn enrich(
        &self,
        wt: &Worktree,
        relationships: &std::collections::HashMap<String, BranchRelationship>,
    ) -> Option<WorkerView> {
        let branch_name = wt.branch.clone()?;
        if let Err(err) = branch::validate_branch_name(&branch_name) {
            log::warn!("skipping worktree {}: {}", wt.path.display(), err.detail());
            return None;
        }

        let relationship = relationships
            .get(&branch_name)
            .cloned()
            .unwrap_or_default();

        let dir = Repository::at(&wt.path).dir_state();
        let review = self.cache.get_or_fetch(&self.repo, &branch_name);

        let name = wt
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| branch_name.clone());

        Some(WorkerView {
            name,
            path: wt.path.clone(),
            branch: branch_name,
            relationship,
            dir_status: dir.status,
            activity: dir.activity,
            review,
        })
    }
}

/// Select the worktrees that represent workers.
///
/// The worktree checked out on the default branch is the coordinator, not a
/// worker; detached and bare entries carry no branch to coordinate on.
pub(crate) fn worker_worktrees<'a>(
    worktrees: &'a [Worktree],
    default_branch: &str,
) -> Vec<&'a Worktree> {
    worktrees
        .iter()
        .filter(|wt| !wt.bare && !wt.detached)
        .filter(|wt| wt.branch.as_deref() != Some(default_branch))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn wt(path: &str, branch: Option<&str>, bare: bool, detached: bool) -> Worktree {
        Worktree {
            path: PathBuf::from(path),
            head: "abc123".into(),
            branch: branch.map(String::from),
            bare,
            detached,
        }
    }

    #[test]
    fn default_branch_worktree_is_excluded() {
        let worktrees = vec![
            wt("/repo", Some("main"), false, false),
            wt("/repo-feature", Some("feature/x"), false, false),
        ];
        let workers = worker_worktrees(&worktrees, "main");
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].branch.as_deref(), Some("feature/x"));
    }

    #[test]
    fn detached_and_bare_are_excluded() {
        let worktrees = vec![
            wt("/bare", None, true, false),
            wt("/detached", None, false, true),
            wt("/worker", Some("fix/y"), false, false),
        ];
        let workers = worker_worktrees(&worktrees, "main");
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].path, PathBuf::from("/worker"));
    }

    #[test]
    fn no_workers_when_only_main_exists() {
        let worktrees = vec![wt("/repo", Some("main"), false, false)];
        assert!(worker_worktrees(&worktrees, "main").is_empty());
    }

    #[test]
    fn same_branch_name_under_different_default_is_a_worker() {
        let worktrees = vec![wt("/repo-main", Some("main"), false, false)];
        let workers = worker_worktrees(&worktrees, "master");
        assert_eq!(workers.len(), 1);
    }

    #[test]
    fn refresh_in_flight_coalesces_to_published_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let agg = Aggregator::new(Repository::at(dir.path()));

        let sentinel = Arc::new(Snapshot {
            default_branch: "sentinel".to_string(),
            workers: Vec::new(),
        });
        *agg.snapshot.write().unwrap() = Arc::clone(&sentinel);
        agg.refreshing.store(true, Ordering::SeqCst);

        // While another refresh holds the guard, callers get the last
        // published snapshot, not a second rebuild.
        let got = agg.refresh();
        assert_eq!(got.default_branch, "sentinel");
        assert!(agg.refreshing.load(Ordering::SeqCst));

        // Once the guard clears, refresh rebuilds for real: the empty
        // directory resolves to the fallback default branch.
        agg.refreshing.store(false, Ordering::SeqCst);
        let rebuilt = agg.refresh();
        assert_eq!(rebuilt.default_branch, "main");
        assert!(!agg.refreshing.load(Ordering::SeqCst));
    }
}
