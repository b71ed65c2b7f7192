//! Push a worker branch and open a pull request via the `gh` CLI.

use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::git::branch::validate_branch_name;
use crate::git::WarrenError;
use crate::review::run_gh;
use crate::workspace::lookup;

#[derive(Debug, Clone, Serialize)]
pub struct PrReport {
    pub branch: String,
    pub url: String,
    pub auto_merge_enabled: bool,
    /// Auto-merge is best effort; a failure is reported but does not undo
    /// the created PR.
    pub auto_merge_error: Option<String>,
}

/// Push the branch, create a PR against the default branch, and attempt to
/// enable auto-merge.
///
/// Title defaults to the branch's most recent commit subject; body defaults
/// to a short provenance note. Push and create failures abort; auto-merge
/// failure does not.
pub fn create_pull_request(
    agg: &Aggregator,
    branch: &str,
    title: Option<&str>,
    body: Option<&str>,
    auto_merge: bool,
) -> Result<PrReport, WarrenError> {
    validate_branch_name(branch)?;
    let snapshot = agg.refresh();
    let worker = lookup(&snapshot, branch)?;
    let repo = agg.repo();

    repo.run(&["push", "-u", "origin", "--", branch])?;

    let subject = worker.relationship.last_subject.clone();
    let title = match title {
        Some(title) => title.to_string(),
        None if !subject.is_empty() => subject,
        None => branch.to_string(),
    };
    let body = body.unwrap_or("Opened by warren");

    let url = run_gh(
        repo,
        &[
            "pr", "create", "--head", branch, "--title", title.as_str(), "--body", body,
        ],
    )?
    .trim()
    .to_string();

    let mut report = PrReport {
        branch: branch.to_string(),
        url: url.clone(),
        auto_merge_enabled: false,
        auto_merge_error: None,
    };
    if !auto_merge {
        return Ok(report);
    }

    // gh prints the PR URL on the last line; its trailing segment is the
    // PR number.
    let number = url.rsplit('/').next().unwrap_or(&url);
    match run_gh(repo, &["pr", "merge", number, "--auto", "--squash"]) {
        Ok(_) => report.auto_merge_enabled = true,
        Err(err) => report.auto_merge_error = Some(err.detail()),
    }
    Ok(report)
}
