//! Bring every worker branch up to date with the remote default branch.

use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{Aggregator, WorkerView};
use crate::git::{DirStatus, Repository, WarrenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    Rebase,
    Merge,
}

impl UpdateMethod {
    fn apply_args(self, target: &str) -> [String; 2] {
        match self {
            UpdateMethod::Rebase => ["rebase".to_string(), target.to_string()],
            UpdateMethod::Merge => ["merge".to_string(), target.to_string()],
        }
    }

    fn abort_args(self) -> [&'static str; 2] {
        match self {
            UpdateMethod::Rebase => ["rebase", "--abort"],
            UpdateMethod::Merge => ["merge", "--abort"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated,
    UpToDate,
    /// Dirty worktree; never touched.
    SkippedDirty,
    /// Rebase or merge conflicted and was aborted; worktree restored.
    Conflict,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateEntry {
    pub branch: String,
    pub path: PathBuf,
    pub outcome: UpdateOutcome,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub dry_run: bool,
    pub method: UpdateMethod,
    pub entries: Vec<UpdateEntry>,
}

impl UpdateReport {
    pub fn count(&self, outcome: UpdateOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }
}

/// Update every worker branch onto `origin/<default>`.
///
/// One fetch up front, then each worker is processed independently in
/// parallel; worker order in the report matches snapshot order. A fetch
/// failure aborts the whole run since every per-worker decision depends on
/// fresh remote refs.
pub fn update_branches(
    agg: &Aggregator,
    method: UpdateMethod,
    dry_run: bool,
) -> Result<UpdateReport, WarrenError> {
    agg.repo().run(&["fetch", "origin"])?;
    let snapshot = agg.refresh();
    let target = format!("origin/{}", snapshot.default_branch);

    let entries: Vec<UpdateEntry> = snapshot
        .workers
        .par_iter()
        .map(|worker| update_worker(worker, &target, method, dry_run))
        .collect();

    Ok(UpdateReport {
        dry_run,
        method,
        entries,
    })
}

fn update_worker(
    worker: &WorkerView,
    target: &str,
    method: UpdateMethod,
    dry_run: bool,
) -> UpdateEntry {
    let entry = |outcome, error| UpdateEntry {
        branch: worker.branch.clone(),
        path: worker.path.clone(),
        outcome,
        error,
    };

    // Precedence: existence, then cleanliness, then freshness.
    match worker.dir_status {
        DirStatus::Missing => {
            return entry(
                UpdateOutcome::Failed,
                Some("worktree path does not exist".to_string()),
            );
        }
        DirStatus::Modified => return entry(UpdateOutcome::SkippedDirty, None),
        DirStatus::Clean | DirStatus::Unknown => {}
    }

    let repo = Repository::at(&worker.path);
    if is_up_to_date(&repo, &worker.branch, target) {
        return entry(UpdateOutcome::UpToDate, None);
    }
    if dry_run {
        // Would be updated; conflicts only surface on a real attempt.
        return entry(UpdateOutcome::Updated, None);
    }

    let args = method.apply_args(target);
    let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = match repo.output(&args_ref) {
        Ok(output) => output,
        Err(err) => return entry(UpdateOutcome::Failed, Some(err.detail())),
    };
    if output.status.success() {
        return entry(UpdateOutcome::Updated, None);
    }

    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout).trim(),
        String::from_utf8_lossy(&output.stderr).trim()
    );
    if is_conflict(&combined) {
        let mut detail = combined.trim().to_string();
        if let Err(err) = repo.run(&method.abort_args()) {
            detail = format!("{detail}; abort failed: {}", err.detail());
        }
        entry(UpdateOutcome::Conflict, Some(detail))
    } else {
        entry(UpdateOutcome::Failed, Some(combined.trim().to_string()))
    }
}

/// The branch already contains the remote target when the merge-base with
/// the target is the target itself.
fn is_up_to_date(repo: &Repository, branch: &str, target: &str) -> bool {
    let base = repo.run(&["merge-base", branch, target]);
    let tip = repo.run(&["rev-parse", target]);
    match (base, tip) {
        (Ok(base), Ok(tip)) => base.trim() == tip.trim(),
        _ => false,
    }
}

/// Classify failed rebase/merge output. Git wording varies across versions
/// and commands, so this matches the one word they all share.
pub(crate) fn is_conflict(output: &str) -> bool {
    output.to_lowercase().contains("conflict")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_detection_is_case_insensitive() {
        assert!(is_conflict("CONFLICT (content): Merge conflict in a.txt"));
        assert!(is_conflict(
            "error: could not apply abc123... subject\nhint: Resolve all conflicts manually"
        ));
        assert!(!is_conflict("fatal: not a git repository"));
        assert!(!is_conflict(""));
    }

    #[test]
    fn report_counts_by_outcome() {
        let entry = |outcome| UpdateEntry {
            branch: "b".into(),
            path: PathBuf::from("/w"),
            outcome,
            error: None,
        };
        let report = UpdateReport {
            dry_run: false,
            method: UpdateMethod::Rebase,
            entries: vec![
                entry(UpdateOutcome::Updated),
                entry(UpdateOutcome::Updated),
                entry(UpdateOutcome::Conflict),
            ],
        };
        assert_eq!(report.count(UpdateOutcome::Updated), 2);
        assert_eq!(report.count(UpdateOutcome::Conflict), 1);
        assert_eq!(report.count(UpdateOutcome::SkippedDirty), 0);
    }
}
