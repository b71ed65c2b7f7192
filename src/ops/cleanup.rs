//! Remove workers whose branches are fully merged into the default branch.

use std::path::PathBuf;

use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::git::branch::validate_branch_name;

#[derive(Debug, Clone, Serialize)]
pub struct CleanedWorker {
    pub branch: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedWorker {
    pub branch: String,
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub cleaned: Vec<CleanedWorker>,
    pub failed: Vec<FailedWorker>,
}

/// Remove the worktree and local branch of every worker that is fully
/// merged into the default branch.
///
/// Only `branch --merged` candidates are touched; an unmerged worker is
/// never deleted. Removal is sequential so each failure can be attributed
/// to one worker. With `dry_run` the candidates are reported without
/// mutating anything.
pub fn cleanup(agg: &Aggregator, dry_run: bool) -> CleanupReport {
    let snapshot = agg.refresh();
    let repo = agg.repo();

    let merged: Vec<String> = match repo.run(&[
        "branch",
        "--merged",
        &snapshot.default_branch,
        "--format=%(refname:short)",
    ]) {
        Ok(out) => out.lines().map(str::to_string).collect(),
        Err(err) => {
            log::warn!("merged-branch listing failed: {}", err.detail());
            Vec::new()
        }
    };

    let mut report = CleanupReport {
        dry_run,
        cleaned: Vec::new(),
        failed: Vec::new(),
    };

    for worker in &snapshot.workers {
        if !merged.iter().any(|b| b == &worker.branch) {
            continue;
        }
        if validate_branch_name(&worker.branch).is_err() {
            continue;
        }

        if dry_run {
            report.cleaned.push(CleanedWorker {
                branch: worker.branch.clone(),
                path: worker.path.clone(),
            });
            continue;
        }

        let path_arg = worker.path.to_string_lossy();
        if let Err(err) = repo.run(&["worktree", "remove", "--", &path_arg]) {
            report.failed.push(FailedWorker {
                branch: worker.branch.clone(),
                path: worker.path.clone(),
                error: err.detail(),
            });
            continue;
        }

        // The worktree is gone either way; a branch-delete failure leaves a
        // stray local branch, reported but not rolled back.
        match repo.run(&["branch", "-d", "--", &worker.branch]) {
            Ok(_) => report.cleaned.push(CleanedWorker {
                branch: worker.branch.clone(),
                path: worker.path.clone(),
            }),
            Err(err) => report.failed.push(FailedWorker {
                branch: worker.branch.clone(),
                path: worker.path.clone(),
                error: format!(
                    "worktree removed, but branch delete failed: {}",
                    err.detail()
                ),
            }),
        }
    }

    report
}
