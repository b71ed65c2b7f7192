//! Git subprocess plumbing and worktree inventory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub mod branch;
mod error;

pub use error::WarrenError;

/// Used when remote-HEAD resolution fails. This is the single fallback
/// policy system-wide; no other code path hard-codes a branch name.
pub const DEFAULT_BRANCH_FALLBACK: &str = "main";

/// One worktree record from `git worktree list --porcelain`.
///
/// Immutable snapshot: discarded and rebuilt every refresh cycle, never
/// mutated in place across cycles. `branch == None` means detached.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Worktree {
    pub path: PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

/// Working-directory cleanliness for one worktree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirStatus {
    Clean,
    Modified,
    /// The registered path no longer exists on disk (stale registration).
    Missing,
    /// The status check itself failed. Never collapsed into `Clean`.
    Unknown,
}

impl std::fmt::Display for DirStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DirStatus::Clean => "clean",
            DirStatus::Modified => "modified",
            DirStatus::Missing => "missing",
            DirStatus::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// Cleanliness plus an activity hint (the first changed path, if any).
#[derive(Debug, Clone, PartialEq)]
pub struct DirState {
    pub status: DirStatus,
    pub activity: Option<String>,
}

/// Handle to a repository (or one of its worktrees) rooted at a directory.
#[derive(Debug, Clone)]
pub struct Repository {
    dir: PathBuf,
}

impl Repository {
    /// Repository at the current working directory.
    pub fn current() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run git, returning the raw output without checking the exit status.
    pub fn output(&self, args: &[&str]) -> Result<Output, WarrenError> {
        log::debug!("git {} (in {})", args.join(" "), self.dir.display());
        Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| WarrenError::CommandFailed {
                context: format!("git {}", args.join(" ")),
                stderr: e.to_string(),
            })
    }

    /// Run git, requiring success; returns stdout.
    pub fn run(&self, args: &[&str]) -> Result<String, WarrenError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(WarrenError::CommandFailed {
                context: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// List registered worktrees. A failing or empty listing yields an
    /// empty set — absence of worktrees is a valid, common state, not an
    /// error.
    pub fn list_worktrees(&self) -> Vec<Worktree> {
        match self.output(&["worktree", "list", "--porcelain"]) {
            Ok(out) if out.status.success() => {
                parse_worktree_list(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(out) => {
                log::debug!(
                    "worktree list failed: {}",
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Vec::new()
            }
            Err(err) => {
                log::debug!("worktree list failed: {}", err.detail());
                Vec::new()
            }
        }
    }

    /// Resolve the default branch from the remote's symbolic HEAD, falling
    /// back to [`DEFAULT_BRANCH_FALLBACK`] when resolution fails.
    pub fn default_branch(&self) -> String {
        match self.run(&["symbolic-ref", "refs/remotes/origin/HEAD"]) {
            Ok(out) => match out.trim().strip_prefix("refs/remotes/origin/") {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => DEFAULT_BRANCH_FALLBACK.to_string(),
            },
            Err(err) => {
                log::debug!("default branch resolution failed: {}", err.detail());
                DEFAULT_BRANCH_FALLBACK.to_string()
            }
        }
    }

    /// Check working-directory cleanliness for this worktree.
    ///
    /// A missing path short-circuits to `Missing` without spawning git; a
    /// failed status call reports `Unknown`, never `Clean`.
    pub fn dir_state(&self) -> DirState {
        if !self.dir.exists() {
            return DirState {
                status: DirStatus::Missing,
                activity: None,
            };
        }
        match self.output(&["status", "--porcelain"]) {
            Ok(out) if out.status.success() => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                let first_change = stdout.lines().next().map(|l| l.trim().to_string());
                match first_change {
                    Some(line) => DirState {
                        status: DirStatus::Modified,
                        activity: Some(line),
                    },
                    None => DirState {
                        status: DirStatus::Clean,
                        activity: None,
                    },
                }
            }
            _ => DirState {
                status: DirStatus::Unknown,
                activity: None,
            },
        }
    }
}

/// Parse `git worktree list --porcelain` output.
///
/// Line-oriented state machine: a `worktree <path>` line starts a block;
/// `HEAD`, `branch`, `bare` and `detached` lines accumulate into it until
/// the next block or end of input. The final in-progress record is flushed
/// after the loop. A block that never yields a path is not emitted.
pub(crate) fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;

    for line in output.lines() {
        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, Some(v)),
            None => (line, None),
        };

        match key {
            "worktree" => {
                if let Some(wt) = current.take() {
                    worktrees.push(wt);
                }
                if let Some(path) = value.filter(|p| !p.is_empty()) {
                    current = Some(Worktree {
                        path: PathBuf::from(path),
                        head: String::new(),
                        branch: None,
                        bare: false,
                        detached: false,
                    });
                }
            }
            "HEAD" => {
                if let (Some(wt), Some(sha)) = (current.as_mut(), value) {
                    wt.head = sha.to_string();
                }
            }
            "branch" => {
                if let (Some(wt), Some(reference)) = (current.as_mut(), value) {
                    let name = reference.strip_prefix("refs/heads/").unwrap_or(reference);
                    wt.branch = Some(name.to_string());
                }
            }
            "bare" => {
                if let Some(wt) = current.as_mut() {
                    wt.bare = true;
                }
            }
            "detached" => {
                if let Some(wt) = current.as_mut() {
                    wt.detached = true;
                }
            }
            // Ignore unknown attributes for forward compatibility
            _ => {}
        }
    }

    if let Some(wt) = current {
        worktrees.push(wt);
    }

    worktrees
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "worktree /path/to/main
HEAD abcd1234
branch refs/heads/main

worktree /path/to/feature
HEAD efgh5678
branch refs/heads/feature/login

";

    #[test]
    fn parse_two_worktrees() {
        let worktrees = parse_worktree_list(SAMPLE);
        assert_eq!(worktrees.len(), 2);

        assert_eq!(worktrees[0].path, PathBuf::from("/path/to/main"));
        assert_eq!(worktrees[0].head, "abcd1234");
        assert_eq!(worktrees[0].branch, Some("main".to_string()));
        assert!(!worktrees[0].bare);
        assert!(!worktrees[0].detached);

        assert_eq!(worktrees[1].branch, Some("feature/login".to_string()));
    }

    #[test]
    fn parse_is_idempotent() {
        assert_eq!(parse_worktree_list(SAMPLE), parse_worktree_list(SAMPLE));
    }

    #[test]
    fn parse_flushes_final_record_without_trailing_blank() {
        let output = "worktree /repo\nHEAD abc\nbranch refs/heads/main";
        let worktrees = parse_worktree_list(output);
        assert_eq!(worktrees.len(), 1);
        assert_eq!(worktrees[0].branch, Some("main".to_string()));
    }

    #[test]
    fn parse_detached_worktree() {
        let output = "worktree /path/to/detached\nHEAD abcd1234\ndetached\n";
        let worktrees = parse_worktree_list(output);
        assert_eq!(worktrees.len(), 1);
        assert!(worktrees[0].detached);
        assert_eq!(worktrees[0].branch, None);
    }

    #[test]
    fn parse_bare_worktree() {
        let output = "worktree /path/to/bare\nHEAD abcd1234\nbare\n";
        let worktrees = parse_worktree_list(output);
        assert_eq!(worktrees.len(), 1);
        assert!(worktrees[0].bare);
    }

    #[test]
    fn record_without_path_is_not_emitted() {
        let output = "worktree\nHEAD abcd1234\nbranch refs/heads/orphan\n";
        assert!(parse_worktree_list(output).is_empty());
    }

    #[test]
    fn parse_empty_output() {
        assert!(parse_worktree_list("").is_empty());
    }

    #[test]
    fn branch_prefix_is_stripped_only_once() {
        let output = "worktree /w\nHEAD a\nbranch refs/heads/refs/heads/x\n";
        let worktrees = parse_worktree_list(output);
        assert_eq!(worktrees[0].branch, Some("refs/heads/x".to_string()));
    }
}
