use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "warren", version, about = "Coordinate parallel AI agent workers in git worktrees")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List active workers and their status
    List {
        /// Emit the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one worker's full status, commits, and diff stats
    Details {
        /// Worker branch name
        branch: String,
        /// Emit the details as JSON
        #[arg(long)]
        json: bool,
    },
    /// Live status monitor (q quit, r refresh, u update, c cleanup, p pr)
    Watch {
        /// Seconds between automatic refreshes
        #[arg(short, long, default_value_t = 5)]
        interval: u64,
        /// Plain periodic output instead of the interactive screen
        #[arg(long)]
        simple: bool,
    },
    /// Remove workers whose branches are merged into the default branch
    Cleanup {
        /// Show what would be removed without removing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Update every worker branch onto the remote default branch
    Update {
        /// Show what would be updated without touching any worktree
        #[arg(long)]
        dry_run: bool,
        /// Merge instead of rebase
        #[arg(long)]
        merge: bool,
    },
    /// Push a worker branch and open a pull request
    Pr {
        /// Worker branch name
        branch: String,
        /// PR title (defaults to the branch's latest commit subject)
        #[arg(long)]
        title: Option<String>,
        /// PR body
        #[arg(long)]
        body: Option<String>,
        /// Do not enable auto-merge on the created PR
        #[arg(long)]
        no_auto_merge: bool,
    },
    /// Serve the JSON-RPC tool interface over stdio
    Serve,
}
