//! Read-only workspace access: per-worker details, sandboxed file reads,
//! and diffs against the default branch.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::{Aggregator, Snapshot, WorkerView};
use crate::git::branch::{self, validate_branch_name};
use crate::git::{Repository, WarrenError};

/// Find the worker bound to a branch in a published snapshot.
pub fn lookup<'a>(snapshot: &'a Snapshot, branch: &str) -> Result<&'a WorkerView, WarrenError> {
    snapshot
        .workers
        .iter()
        .find(|w| w.branch == branch)
        .ok_or_else(|| WarrenError::WorkerNotFound {
            branch: branch.to_string(),
        })
}

/// Expanded view of one worker: the snapshot row plus its commit log and
/// diff statistics against the default branch.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerDetails {
    #[serde(flatten)]
    pub worker: WorkerView,
    /// Count from `rev-list`, independent of how many log lines follow.
    pub commits_ahead: usize,
    /// `--oneline` log entries, newest first.
    pub commits: Vec<String>,
    pub diff_stat: String,
}

pub fn worker_details(agg: &Aggregator, branch: &str) -> Result<WorkerDetails, WarrenError> {
    validate_branch_name(branch)?;
    let snapshot = agg.refresh();
    let worker = lookup(&snapshot, branch)?.clone();
    let default = &snapshot.default_branch;

    // The queries below degrade to empty output on failure; the detail view
    // is still useful with just the snapshot row.
    let log_range = format!("{default}..{branch}");
    let commits: Vec<String> = agg
        .repo()
        .run(&["log", &log_range, "--oneline"])
        .map(|out| out.lines().map(str::to_string).collect())
        .unwrap_or_default();

    let commits_ahead =
        branch::commits_ahead(agg.repo(), branch, default).unwrap_or(commits.len());

    let diff_range = format!("{default}...{branch}");
    let diff_stat = agg
        .repo()
        .run(&["diff", &diff_range, "--stat"])
        .map(|out| out.trim_end().to_string())
        .unwrap_or_default();

    Ok(WorkerDetails {
        worker,
        commits_ahead,
        commits,
        diff_stat,
    })
}

/// Read a file from inside a worker's worktree.
///
/// The relative path is resolved against the worktree root and must stay
/// inside it after symlink resolution; anything else is denied.
pub fn read_file(agg: &Aggregator, branch: &str, rel_path: &str) -> Result<String, WarrenError> {
    validate_branch_name(branch)?;
    let snapshot = agg.refresh();
    let worker = lookup(&snapshot, branch)?;

    let resolved = resolve_in_root(&worker.path, rel_path)?;
    std::fs::read_to_string(&resolved).map_err(|_| WarrenError::FileNotFound {
        path: PathBuf::from(rel_path),
    })
}

/// Diff a worker's branch against the default branch, optionally narrowed
/// to one file.
pub fn diff(agg: &Aggregator, branch: &str, file: Option<&str>) -> Result<String, WarrenError> {
    validate_branch_name(branch)?;
    let snapshot = agg.refresh();
    let worker = lookup(&snapshot, branch)?;

    let range = format!("{}...{branch}", snapshot.default_branch);
    let worker_repo = Repository::at(&worker.path);
    match file {
        Some(file) => worker_repo.run(&["diff", &range, "--", file]),
        None => worker_repo.run(&["diff", &range]),
    }
}

/// Resolve `rel_path` against `root`, enforcing containment on the real
/// (symlink-free) paths. `dunce` keeps Windows paths in their non-UNC form
/// so the prefix comparison holds.
///
/// Escaping paths are rejected lexically before any filesystem access, so
/// the error never reveals whether something exists outside the root; the
/// post-canonicalization check then catches symlink escapes.
pub(crate) fn resolve_in_root(root: &Path, rel_path: &str) -> Result<PathBuf, WarrenError> {
    use std::path::Component;

    let denied = || WarrenError::AccessDenied {
        path: PathBuf::from(rel_path),
    };

    let mut depth: usize = 0;
    for component in Path::new(rel_path).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth = depth.checked_sub(1).ok_or_else(denied)?;
            }
            Component::RootDir | Component::Prefix(_) => return Err(denied()),
        }
    }

    let real_root = dunce::canonicalize(root).map_err(|_| WarrenError::FileNotFound {
        path: root.to_path_buf(),
    })?;

    let candidate = real_root.join(rel_path);
    let resolved = dunce::canonicalize(&candidate).map_err(|_| WarrenError::FileNotFound {
        path: PathBuf::from(rel_path),
    })?;

    if !resolved.starts_with(&real_root) {
        return Err(denied());
    }
    if !resolved.is_file() {
        return Err(WarrenError::FileNotFound {
            path: PathBuf::from(rel_path),
        });
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_inside_root_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}\n").unwrap();

        let resolved = resolve_in_root(dir.path(), "src/lib.rs").unwrap();
        assert!(resolved.ends_with("src/lib.rs"));
    }

    #[test]
    fn traversal_outside_root_is_denied() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();

        let err = resolve_in_root(&root, "../secret.txt").unwrap_err();
        assert!(matches!(err, WarrenError::AccessDenied { .. }));
    }

    #[test]
    fn traversal_to_missing_outside_target_is_still_denied() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing exists at the escaped location; the denial must not say so.
        let err = resolve_in_root(dir.path(), "../no-such-file-anywhere.txt").unwrap_err();
        assert!(matches!(err, WarrenError::AccessDenied { .. }));
    }

    #[test]
    fn interior_parent_components_may_not_net_escape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("ok.txt"), "ok\n").unwrap();

        let resolved = resolve_in_root(dir.path(), "sub/../ok.txt").unwrap();
        assert!(resolved.ends_with("ok.txt"));

        let err = resolve_in_root(dir.path(), "sub/../../elsewhere.txt").unwrap_err();
        assert!(matches!(err, WarrenError::AccessDenied { .. }));
    }

    #[test]
    fn absolute_paths_are_denied() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in_root(dir.path(), "/etc/hostname").unwrap_err();
        assert!(matches!(err, WarrenError::AccessDenied { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_in_root(dir.path(), "nope.txt").unwrap_err();
        assert!(matches!(err, WarrenError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let err = resolve_in_root(dir.path(), "sub").unwrap_err();
        assert!(matches!(err, WarrenError::FileNotFound { .. }));
    }
}
