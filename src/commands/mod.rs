//! CLI command implementations.

pub mod details;
pub mod list;
pub mod ops;
pub mod watch;
