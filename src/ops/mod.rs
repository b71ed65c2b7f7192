//! Mutation operations: cleanup, branch updates, and PR creation.
//!
//! Every operation here validates branch names before passing them to an
//! external command and reports per-worker outcomes in a structured report
//! rather than aborting the batch on the first failure.

mod cleanup;
mod pr;
mod update;

pub use cleanup::{cleanup, CleanedWorker, CleanupReport, FailedWorker};
pub use pr::{create_pull_request, PrReport};
pub use update::{update_branches, UpdateEntry, UpdateMethod, UpdateOutcome, UpdateReport};
