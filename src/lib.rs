//! warren — coordination library for parallel agent worktrees.
//!
//! Each unit of automated work (a "worker") lives in its own git worktree,
//! bound to its own branch. This crate discovers the active workers,
//! computes their relationship to the shared default branch, reconciles
//! that state with the remote review system, and mutates shared state
//! (worktrees, branches, pull requests) without corrupting it.
//!
//! Module map:
//! - [`git`] — subprocess plumbing, worktree inventory, branch validation
//!   and relationship queries
//! - [`review`] — remote CI/review status via `gh`, with a TTL cache
//! - [`aggregate`] — the per-cycle worker snapshot (the canonical state)
//! - [`ops`] — mutation workflows: cleanup, branch update, PR creation
//! - [`workspace`] — sandboxed file and diff access into worker worktrees
//! - [`server`] — line-delimited JSON-RPC surface for tool-calling agents

pub mod aggregate;
pub mod git;
pub mod ops;
pub mod review;
pub mod server;
pub mod styling;
pub mod workspace;
