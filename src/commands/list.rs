//! `warren list`: one-shot status table.

use color_print::cformat;

use warren::aggregate::{Aggregator, Snapshot, WorkerView};
use warren::git::DirStatus;
use warren::review::{CiStatus, ReviewDecision};
use warren::styling;

pub fn run(agg: &Aggregator, json: bool) -> anyhow::Result<()> {
    let snapshot = agg.refresh();
    if json {
        println!("{}", serde_json::to_string_pretty(&*snapshot)?);
        return Ok(());
    }
    render(&snapshot);
    Ok(())
}

pub(crate) fn render(snapshot: &Snapshot) {
    if snapshot.workers.is_empty() {
        styling::println!(
            "{} No active workers. Main worktree only.",
            styling::INFO_EMOJI
        );
        return;
    }

    styling::println!(
        "{}",
        cformat!(
            "<bold>{:<24} {:>6} {:>6} {:<10} {:>5} {:>5}  {}</>",
            "WORKER", "AHEAD", "BEHIND", "DIR", "CI", "REV", "LAST COMMIT"
        )
    );
    for worker in &snapshot.workers {
        styling::println!("{}", row(worker));
    }
}

/// Pad each cell first, then style it; styling adds invisible bytes that
/// would otherwise break column alignment.
pub(crate) fn row(worker: &WorkerView) -> String {
    let name = format!("{:<24}", worker.name);
    let ahead = format!("{:>6}", worker.relationship.ahead);
    let behind = format!(
        "{:>6}",
        worker
            .relationship
            .behind
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    let dir = format!("{:<10}", worker.dir_status);
    let ci = format!("{:>5}", worker.review.ci.label());
    let rev = format!("{:>5}", worker.review.review.label());

    let dir = match worker.dir_status {
        DirStatus::Clean => cformat!("<green>{dir}</>"),
        DirStatus::Modified => cformat!("<yellow>{dir}</>"),
        DirStatus::Missing | DirStatus::Unknown => cformat!("<red>{dir}</>"),
    };
    let ci = match worker.review.ci {
        CiStatus::Pass => cformat!("<green>{ci}</>"),
        CiStatus::Fail => cformat!("<red>{ci}</>"),
        CiStatus::Pending => cformat!("<yellow>{ci}</>"),
        CiStatus::Indeterminate | CiStatus::None => cformat!("<dim>{ci}</>"),
    };
    let rev = match worker.review.review {
        ReviewDecision::Approved => cformat!("<green>{rev}</>"),
        ReviewDecision::ChangesRequested => cformat!("<red>{rev}</>"),
        ReviewDecision::ReviewRequired => cformat!("<yellow>{rev}</>"),
        ReviewDecision::None => cformat!("<dim>{rev}</>"),
    };

    let subject = truncate(&worker.relationship.last_subject, 48);
    cformat!("{name} {ahead} {behind} {dir} {ci} {rev}  <dim>{subject}</>")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_subjects() {
        assert_eq!(truncate("short", 48), "short");
    }

    #[test]
    fn truncate_bounds_long_subjects() {
        let long = "x".repeat(100);
        let out = truncate(&long, 48);
        assert_eq!(out.chars().count(), 48);
        assert!(out.ends_with('…'));
    }
}
