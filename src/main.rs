use std::sync::Arc;

use clap::Parser;

use warren::aggregate::Aggregator;
use warren::git::{Repository, WarrenError};
use warren::ops::UpdateMethod;
use warren::{server, styling};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "warn" },
    ))
    .init();

    let agg = Arc::new(Aggregator::new(Repository::current()));

    let result = match cli.command {
        Commands::List { json } => commands::list::run(&agg, json),
        Commands::Details { branch, json } => commands::details::run(&agg, &branch, json),
        Commands::Watch { interval, simple } => {
            if simple {
                commands::watch::run_simple(&agg, interval)
            } else {
                commands::watch::run(Arc::clone(&agg), interval)
            }
        }
        Commands::Cleanup { dry_run } => commands::ops::run_cleanup(&agg, dry_run),
        Commands::Update { dry_run, merge } => {
            let method = if merge {
                UpdateMethod::Merge
            } else {
                UpdateMethod::Rebase
            };
            commands::ops::run_update(&agg, method, dry_run)
        }
        Commands::Pr {
            branch,
            title,
            body,
            no_auto_merge,
        } => commands::ops::run_pr(
            &agg,
            &branch,
            title.as_deref(),
            body.as_deref(),
            !no_auto_merge,
        ),
        Commands::Serve => server::serve(agg),
    };

    if let Err(err) = result {
        // Domain errors carry their own styled rendering with hints;
        // everything else gets the generic treatment.
        match err.downcast_ref::<WarrenError>() {
            Some(domain) => styling::println!("{domain}"),
            None => styling::println!("{} {err:#}", styling::ERROR_EMOJI),
        }
        std::process::exit(1);
    }
}
