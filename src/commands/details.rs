//! `warren details <branch>`: expanded view of one worker.

use color_print::cformat;

use warren::aggregate::Aggregator;
use warren::styling;
use warren::workspace::{self, WorkerDetails};

pub fn run(agg: &Aggregator, branch: &str, json: bool) -> anyhow::Result<()> {
    let details = workspace::worker_details(agg, branch)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }
    for line in render_lines(&details) {
        styling::println!("{line}");
    }
    Ok(())
}

pub(crate) fn render_lines(details: &WorkerDetails) -> Vec<String> {
    let worker = &details.worker;
    let behind = worker
        .relationship
        .behind
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        cformat!("<bold>{}</> <dim>({})</>", worker.branch, worker.path.display()),
        cformat!(
            "ahead <bold>{}</> · behind {} · dir {} · ci {} · review {}",
            details.commits_ahead,
            behind,
            worker.dir_status,
            worker.review.ci.label(),
            worker.review.review.label()
        ),
    ];
    if let Some(activity) = &worker.activity {
        lines.push(cformat!("<yellow>activity</> {activity}"));
    }

    if !details.commits.is_empty() {
        lines.push(String::new());
        lines.push(cformat!("<bold>commits</>"));
        for commit in &details.commits {
            lines.push(format!("  {commit}"));
        }
    }
    if !details.diff_stat.is_empty() {
        lines.push(String::new());
        lines.push(cformat!("<bold>diff</>"));
        for line in details.diff_stat.lines() {
            lines.push(format!("  {line}"));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use warren::aggregate::WorkerView;
    use warren::git::branch::BranchRelationship;
    use warren::git::DirStatus;
    use warren::review::RemoteReviewStatus;

    fn sample() -> WorkerDetails {
        WorkerDetails {
            worker: WorkerView {
                name: "repo-feature".into(),
                path: PathBuf::from("/workers/repo-feature"),
                branch: "feature/x".into(),
                relationship: BranchRelationship {
                    ahead: 2,
                    behind: Some(1),
                    last_subject: "refine work".into(),
                },
                dir_status: DirStatus::Clean,
                activity: None,
                review: RemoteReviewStatus::default(),
            },
            commits_ahead: 2,
            commits: vec!["abc1234 refine work".into(), "def5678 implement work".into()],
            diff_stat: " impl.rs | 1 +\n 1 file changed".into(),
        }
    }

    #[test]
    fn renders_identity_commits_and_diff() {
        let lines = render_lines(&sample());
        let text = lines.join("\n");
        assert!(text.contains("feature/x"));
        assert!(text.contains("ahead"));
        assert!(text.contains("refine work"));
        assert!(text.contains("impl.rs"));
    }

    #[test]
    fn skips_empty_sections() {
        let mut details = sample();
        details.commits.clear();
        details.diff_stat.clear();
        let text = render_lines(&details).join("\n");
        assert!(!text.contains("commits"));
        assert!(!text.contains("diff"));
    }
}
