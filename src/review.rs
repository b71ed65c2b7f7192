//! Remote review and CI status via the `gh` CLI, with a TTL cache.
//!
//! A branch without a pull request is an ordinary condition, reported as
//! `None` status rather than an error. The cache is an explicit object
//! injected into the aggregator so tests can substitute its contents.

use std::process::Command;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::git::{Repository, WarrenError};

/// How long a fetched status stays fresh before re-querying the remote.
pub const STATUS_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CiStatus {
    Pass,
    Fail,
    Pending,
    /// Checks exist but their rollup fits no other bucket.
    Indeterminate,
    /// No PR, or no checks configured.
    None,
}

impl CiStatus {
    /// Short label for table cells.
    pub fn label(&self) -> &'static str {
        match self {
            CiStatus::Pass => "pass",
            CiStatus::Fail => "fail",
            CiStatus::Pending => "...",
            CiStatus::Indeterminate => "?",
            CiStatus::None => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    None,
}

impl ReviewDecision {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "ok",
            ReviewDecision::ChangesRequested => "chg",
            ReviewDecision::ReviewRequired => "req",
            ReviewDecision::None => "-",
        }
    }
}

/// Review-system state for one branch's pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoteReviewStatus {
    pub ci: CiStatus,
    pub review: ReviewDecision,
}

impl Default for RemoteReviewStatus {
    fn default() -> Self {
        Self {
            ci: CiStatus::None,
            review: ReviewDecision::None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PrInfo {
    #[serde(rename = "statusCheckRollup", default)]
    status_check_rollup: Option<Vec<CheckRun>>,
    #[serde(rename = "reviewDecision", default)]
    review_decision: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    status: Option<String>,
    conclusion: Option<String>,
}

impl PrInfo {
    fn ci_status(&self) -> CiStatus {
        let Some(checks) = &self.status_check_rollup else {
            return CiStatus::None;
        };
        if checks.is_empty() {
            return CiStatus::None;
        }

        let has_failure = checks.iter().any(|c| {
            matches!(
                c.conclusion.as_deref(),
                Some("FAILURE" | "ERROR" | "CANCELLED")
            )
        });
        let has_pending = checks.iter().any(|c| {
            matches!(
                c.status.as_deref(),
                Some("IN_PROGRESS" | "QUEUED" | "PENDING" | "EXPECTED")
            )
        });
        let all_success = checks
            .iter()
            .all(|c| c.conclusion.as_deref() == Some("SUCCESS"));

        if has_failure {
            CiStatus::Fail
        } else if has_pending {
            CiStatus::Pending
        } else if all_success {
            CiStatus::Pass
        } else {
            CiStatus::Indeterminate
        }
    }

    fn review_status(&self) -> ReviewDecision {
        match self.review_decision.as_deref() {
            Some("APPROVED") => ReviewDecision::Approved,
            Some("CHANGES_REQUESTED") => ReviewDecision::ChangesRequested,
            Some("REVIEW_REQUIRED") => ReviewDecision::ReviewRequired,
            _ => ReviewDecision::None,
        }
    }
}

/// Run `gh`, requiring success; returns stdout.
pub(crate) fn run_gh(repo: &Repository, args: &[&str]) -> Result<String, WarrenError> {
    log::debug!("gh {}", args.join(" "));
    let output = Command::new("gh")
        .args(args)
        .current_dir(repo.dir())
        .output()
        .map_err(|e| WarrenError::CommandFailed {
            context: format!("gh {}", args.join(" ")),
            stderr: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(WarrenError::CommandFailed {
            context: format!("gh {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Query `gh pr view` for a branch. Any failure (no PR, no `gh`, bad JSON)
/// degrades to the default status.
pub fn fetch_remote_status(repo: &Repository, branch: &str) -> RemoteReviewStatus {
    let payload = match run_gh(
        repo,
        &[
            "pr",
            "view",
            branch,
            "--json",
            "statusCheckRollup,reviewDecision,state",
        ],
    ) {
        Ok(payload) => payload,
        Err(err) => {
            log::debug!("no PR status for {branch}: {}", err.detail());
            return RemoteReviewStatus::default();
        }
    };

    match serde_json::from_str::<PrInfo>(&payload) {
        Ok(info) => RemoteReviewStatus {
            ci: info.ci_status(),
            review: info.review_status(),
        },
        Err(err) => {
            log::debug!("unparseable PR payload for {branch}: {err}");
            RemoteReviewStatus::default()
        }
    }
}

/// TTL cache for remote review status, keyed by branch name.
///
/// Writes are atomic per key (concurrent map); concurrent misses for the
/// same branch may both query the remote, which is accepted duplicate work.
/// [`StatusCache::invalidate_all`] backs the monitor's manual refresh.
pub struct StatusCache {
    entries: DashMap<String, (RemoteReviewStatus, Instant)>,
    ttl: Duration,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh entry for the branch, if any.
    pub fn get(&self, branch: &str) -> Option<RemoteReviewStatus> {
        let entry = self.entries.get(branch)?;
        let (status, stored_at) = *entry;
        (stored_at.elapsed() < self.ttl).then_some(status)
    }

    pub fn insert(&self, branch: &str, status: RemoteReviewStatus) {
        self.entries.insert(branch.to_string(), (status, Instant::now()));
    }

    /// Drop every entry (manual refresh invalidates wholesale).
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Cached status, or fetch-and-store on a miss.
    pub fn get_or_fetch(&self, repo: &Repository, branch: &str) -> RemoteReviewStatus {
        if let Some(status) = self.get(branch) {
            return status;
        }
        let status = fetch_remote_status(repo, branch);
        self.insert(branch, status);
        status
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(STATUS_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> PrInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn all_success_is_pass() {
        let info = parse(
            r#"{"statusCheckRollup":[{"status":"COMPLETED","conclusion":"SUCCESS"},{"status":"COMPLETED","conclusion":"SUCCESS"}],"reviewDecision":"APPROVED"}"#,
        );
        assert_eq!(info.ci_status(), CiStatus::Pass);
        assert_eq!(info.review_status(), ReviewDecision::Approved);
    }

    #[test]
    fn any_failure_wins_over_pending() {
        let info = parse(
            r#"{"statusCheckRollup":[{"status":"IN_PROGRESS","conclusion":null},{"status":"COMPLETED","conclusion":"FAILURE"}],"reviewDecision":null}"#,
        );
        assert_eq!(info.ci_status(), CiStatus::Fail);
    }

    #[test]
    fn pending_checks_report_pending() {
        let info = parse(
            r#"{"statusCheckRollup":[{"status":"QUEUED","conclusion":null}],"reviewDecision":"REVIEW_REQUIRED"}"#,
        );
        assert_eq!(info.ci_status(), CiStatus::Pending);
        assert_eq!(info.review_status(), ReviewDecision::ReviewRequired);
    }

    #[test]
    fn missing_rollup_is_none() {
        let info = parse(r#"{"reviewDecision":"CHANGES_REQUESTED"}"#);
        assert_eq!(info.ci_status(), CiStatus::None);
        assert_eq!(info.review_status(), ReviewDecision::ChangesRequested);
    }

    #[test]
    fn skipped_checks_are_indeterminate() {
        let info = parse(
            r#"{"statusCheckRollup":[{"status":"COMPLETED","conclusion":"SKIPPED"}],"reviewDecision":null}"#,
        );
        assert_eq!(info.ci_status(), CiStatus::Indeterminate);
    }

    #[test]
    fn cache_returns_fresh_entries() {
        let cache = StatusCache::new(Duration::from_secs(60));
        let status = RemoteReviewStatus {
            ci: CiStatus::Pass,
            review: ReviewDecision::Approved,
        };
        cache.insert("feature/x", status);
        assert_eq!(cache.get("feature/x"), Some(status));
        assert_eq!(cache.get("feature/other"), None);
    }

    #[test]
    fn cache_expires_after_ttl() {
        let cache = StatusCache::new(Duration::ZERO);
        cache.insert("feature/x", RemoteReviewStatus::default());
        assert_eq!(cache.get("feature/x"), None);
    }

    #[test]
    fn invalidate_all_drops_everything() {
        let cache = StatusCache::new(Duration::from_secs(60));
        cache.insert("a", RemoteReviewStatus::default());
        cache.insert("b", RemoteReviewStatus::default());
        cache.invalidate_all();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }
}
