//! Branch-name validation and branch↔default-branch relationship queries.

use std::collections::HashMap;

use super::{Repository, WarrenError};

/// Validate a candidate branch name.
///
/// This is the mandatory gate before any external command that embeds a
/// branch name as an argument: it is the sole defense against
/// argument-injection (`-` prefixes) and invalid git references. Rejection
/// reasons are checked in precedence order and reported individually.
pub fn validate_branch_name(branch: &str) -> Result<(), WarrenError> {
    let reason = if branch.is_empty() {
        Some("cannot be empty")
    } else if branch.starts_with('-') {
        Some("cannot start with '-'")
    } else if !branch
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'_' | b'.' | b'-'))
    {
        Some("contains invalid characters")
    } else if branch.contains("..") {
        Some("cannot contain '..'")
    } else if branch.contains("//") {
        Some("cannot contain '//'")
    } else if branch.ends_with('/') || branch.ends_with('.') {
        Some("cannot end with '/' or '.'")
    } else if branch.starts_with('/') {
        Some("cannot start with '/'")
    } else if branch == "@" {
        Some("cannot be '@'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(WarrenError::InvalidBranch {
            branch: branch.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// How a branch relates to the default branch, derived once per refresh.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BranchRelationship {
    /// Commits reachable from the branch but not from the default branch.
    pub ahead: usize,
    pub behind: Option<usize>,
    /// Most recent commit subject on the branch.
    pub last_subject: String,
}

/// Per-branch ahead count via `rev-list --count`, for detail views.
pub fn commits_ahead(
    repo: &Repository,
    branch: &str,
    default_branch: &str,
) -> Result<usize, WarrenError> {
    validate_branch_name(branch)?;
    let range = format!("{default_branch}..{branch}");
    let out = repo.run(&["rev-list", "--count", &range])?;
    Ok(out.trim().parse().unwrap_or(0))
}

/// Batched relationship query: one `for-each-ref` call covering every local
/// branch, so the aggregator avoids O(workers) round trips.
///
/// A failing invocation degrades to an empty map; the aggregator treats an
/// absent entry as zero/empty rather than aborting the cycle.
pub fn relationships(
    repo: &Repository,
    default_branch: &str,
) -> HashMap<String, BranchRelationship> {
    let format = format!(
        "--format=%(refname:short)|%(subject)|%(ahead-behind:{default_branch})"
    );
    match repo.output(&["for-each-ref", &format, "refs/heads/"]) {
        Ok(out) if out.status.success() => {
            parse_relationships(&String::from_utf8_lossy(&out.stdout))
        }
        _ => {
            log::debug!("batched relationship query failed; degrading to empty map");
            HashMap::new()
        }
    }
}

/// Parse `branch|subject|ahead behind` lines.
///
/// Commit subjects may themselves contain the `|` delimiter, so only the
/// outermost occurrences are structural: the branch name is split off from
/// the left (branch names cannot contain `|`) and the count field from the
/// right, leaving the subject intact in between. Numeric parse failures
/// degrade to zero, never to an error that aborts the whole batch.
pub(crate) fn parse_relationships(output: &str) -> HashMap<String, BranchRelationship> {
    let mut map = HashMap::new();
    for line in output.lines() {
        let Some((branch, rest)) = line.split_once('|') else {
            continue;
        };
        let Some((subject, counts)) = rest.rsplit_once('|') else {
            continue;
        };
        let mut nums = counts.split_whitespace();
        let ahead = nums.next().and_then(|n| n.parse().ok()).unwrap_or(0);
        let behind = nums.next().and_then(|n| n.parse().ok());
        map.insert(
            branch.to_string(),
            BranchRelationship {
                ahead,
                behind,
                last_subject: subject.to_string(),
            },
        );
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("-flag")]
    #[case("--force")]
    #[case("has space")]
    #[case("semi;colon")]
    #[case("back\\slash")]
    #[case("tilde~1")]
    #[case("a..b")]
    #[case("a//b")]
    #[case("trailing/")]
    #[case("trailing.")]
    #[case("/leading")]
    #[case("@")]
    fn rejects_invalid_names(#[case] branch: &str) {
        let err = validate_branch_name(branch).unwrap_err();
        assert!(matches!(err, WarrenError::InvalidBranch { .. }));
    }

    #[rstest]
    #[case("main")]
    #[case("feature/login-v2")]
    #[case("user/123")]
    #[case("release-1.2.3")]
    #[case("a")]
    #[case("deep/nested/branch_name")]
    fn accepts_valid_names(#[case] branch: &str) {
        assert!(validate_branch_name(branch).is_ok());
    }

    #[test]
    fn rejection_reason_names_the_problem() {
        let err = validate_branch_name("-rf").unwrap_err();
        assert!(err.detail().contains("cannot start with '-'"));
    }

    #[test]
    fn empty_takes_precedence() {
        let err = validate_branch_name("").unwrap_err();
        assert!(err.detail().contains("empty"));
    }

    #[test]
    fn parse_batched_output() {
        let output = "main|initial commit|0 0\nfeature/x|add parser|3 1\n";
        let map = parse_relationships(output);
        assert_eq!(map.len(), 2);

        let rel = &map["feature/x"];
        assert_eq!(rel.ahead, 3);
        assert_eq!(rel.behind, Some(1));
        assert_eq!(rel.last_subject, "add parser");
    }

    #[test]
    fn subject_may_contain_delimiter() {
        let output = "fix/pipes|handle a|b|c in output|2 0\n";
        let map = parse_relationships(output);
        let rel = &map["fix/pipes"];
        assert_eq!(rel.last_subject, "handle a|b|c in output");
        assert_eq!(rel.ahead, 2);
    }

    #[test]
    fn numeric_garbage_degrades_to_zero() {
        let output = "weird|subject|not numbers\n";
        let map = parse_relationships(output);
        let rel = &map["weird"];
        assert_eq!(rel.ahead, 0);
        assert_eq!(rel.behind, None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let output = "no delimiters here\nonly|one\n";
        // "only|one" splits to branch "only", but the rest has no second
        // delimiter, so the line is dropped rather than mis-parsed.
        assert!(parse_relationships(output).is_empty());
    }
}
