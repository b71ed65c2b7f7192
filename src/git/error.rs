//! Typed domain errors.
//!
//! `WarrenError` is the structured enum for everything the public
//! operations can report: it can be pattern-matched and tested, carried
//! inside `anyhow::Error` via `.into()`, and downcast back where handling
//! differs. `Display` produces styled output for the CLI; [`WarrenError::detail`]
//! produces the plain message used by structured (JSON) surfaces.

use std::path::PathBuf;

use color_print::cwrite;

use crate::styling::{ERROR_EMOJI, HINT_EMOJI};

#[derive(Debug, Clone)]
pub enum WarrenError {
    /// Branch name failed validation; never reached an external command.
    InvalidBranch { branch: String, reason: String },
    /// No active worktree is bound to the named branch.
    WorkerNotFound { branch: String },
    /// Path resolution escaped the worker's worktree root.
    AccessDenied { path: PathBuf },
    /// Requested file does not exist inside the worker's worktree.
    FileNotFound { path: PathBuf },
    /// A subprocess exited non-zero (distinct from a parse failure).
    CommandFailed { context: String, stderr: String },
    /// Rebase or merge produced conflicts; the worktree was restored.
    Conflict { branch: String, output: String },
    /// Output from an external tool could not be interpreted.
    Parse { message: String },
}

impl std::error::Error for WarrenError {}

impl WarrenError {
    /// Stable machine-readable code, used by the JSON-RPC surface.
    pub fn code(&self) -> &'static str {
        match self {
            WarrenError::InvalidBranch { .. } => "invalid_branch",
            WarrenError::WorkerNotFound { .. } => "worker_not_found",
            WarrenError::AccessDenied { .. } => "access_denied",
            WarrenError::FileNotFound { .. } => "not_found",
            WarrenError::CommandFailed { .. } => "command_failed",
            WarrenError::Conflict { .. } => "conflict",
            WarrenError::Parse { .. } => "parse_error",
        }
    }

    /// Plain-text message without styling, for structured surfaces and
    /// per-worker report buckets.
    pub fn detail(&self) -> String {
        match self {
            WarrenError::InvalidBranch { branch, reason } => {
                format!("invalid branch name '{branch}': {reason}")
            }
            WarrenError::WorkerNotFound { branch } => {
                format!("no worker found for branch '{branch}'")
            }
            WarrenError::AccessDenied { path } => {
                format!("access denied: '{}' resolves outside the worktree", path.display())
            }
            WarrenError::FileNotFound { path } => {
                format!("file not found: '{}'", path.display())
            }
            WarrenError::CommandFailed { context, stderr } => {
                if stderr.is_empty() {
                    format!("{context} failed")
                } else {
                    format!("{context} failed: {stderr}")
                }
            }
            WarrenError::Conflict { branch, output } => {
                if output.is_empty() {
                    format!("conflict while updating '{branch}'")
                } else {
                    format!("conflict while updating '{branch}': {output}")
                }
            }
            WarrenError::Parse { message } => message.clone(),
        }
    }
}

impl std::fmt::Display for WarrenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarrenError::InvalidBranch { branch, reason } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Invalid branch name <bold>{branch}</>: {reason}</>"
                )
            }
            WarrenError::WorkerNotFound { branch } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>No worker found for branch <bold>{branch}</></>\n\n{HINT_EMOJI} <dim>Run <bright-black>warren list</><dim> to see active workers</>"
                )
            }
            WarrenError::Conflict { branch, .. } => {
                cwrite!(
                    f,
                    "{ERROR_EMOJI} <red>Conflict while updating <bold>{branch}</></>\n\n{HINT_EMOJI} <dim>The worktree was restored; resolve by updating manually</>"
                )
            }
            other => {
                let detail = other.detail();
                cwrite!(f, "{ERROR_EMOJI} <red>{detail}</>")
            }
        }
    }
}
