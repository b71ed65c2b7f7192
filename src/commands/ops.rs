//! Renderers for the mutation commands.

use color_print::cformat;

use warren::aggregate::Aggregator;
use warren::ops::{self, UpdateMethod, UpdateOutcome};
use warren::styling;

pub fn run_cleanup(agg: &Aggregator, dry_run: bool) -> anyhow::Result<()> {
    let report = ops::cleanup(agg, dry_run);

    if report.cleaned.is_empty() && report.failed.is_empty() {
        styling::println!("{} No merged workers to clean up.", styling::INFO_EMOJI);
        return Ok(());
    }

    for worker in &report.cleaned {
        if dry_run {
            styling::println!(
                "{}",
                cformat!("<yellow>would remove</> <bold>{}</> <dim>({})</>",
                    worker.branch, worker.path.display())
            );
        } else {
            styling::println!(
                "{}",
                cformat!("{} removed <bold>{}</> <dim>({})</>",
                    styling::SUCCESS_EMOJI, worker.branch, worker.path.display())
            );
        }
    }
    for worker in &report.failed {
        styling::println!(
            "{}",
            cformat!("{} <red>{}</>: {}", styling::ERROR_EMOJI, worker.branch, worker.error)
        );
    }
    if dry_run {
        styling::println!(
            "\n{} {}",
            styling::HINT_EMOJI,
            cformat!("<dim>Re-run without <bright-black>--dry-run</><dim> to remove them</>")
        );
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} worker(s) failed to clean up", report.failed.len())
    }
}

pub fn run_update(agg: &Aggregator, method: UpdateMethod, dry_run: bool) -> anyhow::Result<()> {
    let report = ops::update_branches(agg, method, dry_run)?;

    if report.entries.is_empty() {
        styling::println!("{} No active workers to update.", styling::INFO_EMOJI);
        return Ok(());
    }

    for entry in &report.entries {
        let line = match entry.outcome {
            UpdateOutcome::Updated if dry_run => {
                cformat!("<yellow>would update</> <bold>{}</>", entry.branch)
            }
            UpdateOutcome::Updated => {
                cformat!("{} updated <bold>{}</>", styling::SUCCESS_EMOJI, entry.branch)
            }
            UpdateOutcome::UpToDate => {
                cformat!("<dim>up to date</> <bold>{}</>", entry.branch)
            }
            UpdateOutcome::SkippedDirty => {
                cformat!("<yellow>skipped (dirty)</> <bold>{}</>", entry.branch)
            }
            UpdateOutcome::Conflict => {
                cformat!("{} <red>conflict</> <bold>{}</> <dim>(worktree restored)</>",
                    styling::ERROR_EMOJI, entry.branch)
            }
            UpdateOutcome::Failed => {
                let detail = entry.error.as_deref().unwrap_or("unknown failure");
                cformat!("{} <red>failed</> <bold>{}</>: {}",
                    styling::ERROR_EMOJI, entry.branch, detail)
            }
        };
        styling::println!("{line}");
    }

    let conflicts = report.count(UpdateOutcome::Conflict);
    let failed = report.count(UpdateOutcome::Failed);
    styling::println!(
        "\n{}",
        cformat!(
            "<dim>{} updated, {} up to date, {} skipped, {} conflicts, {} failed</>",
            report.count(UpdateOutcome::Updated),
            report.count(UpdateOutcome::UpToDate),
            report.count(UpdateOutcome::SkippedDirty),
            conflicts,
            failed
        )
    );

    if conflicts + failed == 0 {
        Ok(())
    } else {
        anyhow::bail!("{} worker(s) did not update cleanly", conflicts + failed)
    }
}

pub fn run_pr(
    agg: &Aggregator,
    branch: &str,
    title: Option<&str>,
    body: Option<&str>,
    auto_merge: bool,
) -> anyhow::Result<()> {
    let report = ops::create_pull_request(agg, branch, title, body, auto_merge)?;

    styling::println!(
        "{}",
        cformat!("{} opened PR for <bold>{}</>: <cyan>{}</>",
            styling::SUCCESS_EMOJI, report.branch, report.url)
    );
    if report.auto_merge_enabled {
        styling::println!("{}", cformat!("<dim>auto-merge enabled (squash)</>"));
    } else if let Some(err) = &report.auto_merge_error {
        styling::println!(
            "{} {}",
            styling::HINT_EMOJI,
            cformat!("<dim>auto-merge not enabled: {err}</>")
        );
    }
    Ok(())
}
