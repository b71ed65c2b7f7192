//! `warren watch`: live status monitor.
//!
//! The interactive mode runs a crossterm raw-mode event loop on the main
//! thread while a background thread performs refreshes and mutation
//! actions, so a slow remote query or rebase never blocks key handling.
//! Snapshots and action notices flow back over channels and the screen
//! redraws when either arrives.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use color_print::cformat;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute};

use warren::aggregate::{Aggregator, Snapshot};
use warren::ops::{self, UpdateMethod, UpdateOutcome};

use super::list;

enum Trigger {
    Tick,
    /// User-requested refresh; also drops the review-status cache so the
    /// remote is re-queried immediately.
    Manual,
    UpdateBranches,
    Cleanup,
    CreatePr(String),
}

pub fn run(agg: Arc<Aggregator>, interval: u64) -> anyhow::Result<()> {
    let (trigger_tx, trigger_rx) = bounded::<Trigger>(4);
    let (snapshot_tx, snapshot_rx) = bounded::<Arc<Snapshot>>(4);
    let (notice_tx, notice_rx) = bounded::<String>(4);

    let worker_agg = Arc::clone(&agg);
    std::thread::spawn(move || {
        background_loop(worker_agg, trigger_rx, snapshot_tx, notice_tx, interval);
    });

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let result = event_loop(&mut stdout, &trigger_tx, &snapshot_rx, &notice_rx, interval);

    execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

/// Refresh worker: one trigger at a time, a fresh snapshot after each. A
/// mutation trigger runs its op to completion here so the key handler on
/// the main thread never blocks behind git.
fn background_loop(
    agg: Arc<Aggregator>,
    trigger_rx: Receiver<Trigger>,
    snapshot_tx: Sender<Arc<Snapshot>>,
    notice_tx: Sender<String>,
    interval: u64,
) {
    let ticker = tick(Duration::from_secs(interval.max(1)));
    // Initial snapshot before the first tick.
    if snapshot_tx.send(agg.refresh()).is_err() {
        return;
    }
    loop {
        let trigger = select! {
            recv(trigger_rx) -> msg => match msg {
                Ok(t) => t,
                Err(_) => break,
            },
            recv(ticker) -> _ => Trigger::Tick,
        };

        match trigger {
            Trigger::Tick => {}
            Trigger::Manual => agg.cache().invalidate_all(),
            Trigger::UpdateBranches => {
                let notice = match ops::update_branches(&agg, UpdateMethod::Rebase, false) {
                    Ok(report) => format!(
                        "update: {} updated, {} up to date, {} skipped, {} conflicts, {} failed",
                        report.count(UpdateOutcome::Updated),
                        report.count(UpdateOutcome::UpToDate),
                        report.count(UpdateOutcome::SkippedDirty),
                        report.count(UpdateOutcome::Conflict),
                        report.count(UpdateOutcome::Failed),
                    ),
                    Err(err) => format!("update failed: {}", err.detail()),
                };
                let _ = notice_tx.try_send(notice);
            }
            Trigger::Cleanup => {
                let report = ops::cleanup(&agg, false);
                let _ = notice_tx.try_send(format!(
                    "cleanup: {} removed, {} failed",
                    report.cleaned.len(),
                    report.failed.len()
                ));
            }
            Trigger::CreatePr(branch) => {
                let notice = match ops::create_pull_request(&agg, &branch, None, None, true) {
                    Ok(report) => format!("PR opened for {}: {}", report.branch, report.url),
                    Err(err) => format!("PR failed: {}", err.detail()),
                };
                let _ = notice_tx.try_send(notice);
            }
        }
        if snapshot_tx.send(agg.refresh()).is_err() {
            break;
        }
    }
}

fn event_loop(
    stdout: &mut std::io::Stdout,
    trigger_tx: &Sender<Trigger>,
    snapshot_rx: &Receiver<Arc<Snapshot>>,
    notice_rx: &Receiver<String>,
    interval: u64,
) -> anyhow::Result<()> {
    let mut current: Option<Arc<Snapshot>> = None;
    let mut notice: Option<String> = None;
    let mut selected: usize = 0;
    let mut dirty = false;

    loop {
        while let Ok(snapshot) = snapshot_rx.try_recv() {
            selected = clamp_selection(selected, snapshot.workers.len());
            current = Some(snapshot);
            dirty = true;
        }
        while let Ok(message) = notice_rx.try_recv() {
            notice = Some(message);
            dirty = true;
        }
        if dirty {
            if let Some(snapshot) = &current {
                draw(stdout, snapshot, selected, notice.as_deref(), interval)?;
            }
            dirty = false;
        }

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let worker_count = current.as_ref().map_or(0, |s| s.workers.len());
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(());
                }
                KeyCode::Char('r') => {
                    let _ = trigger_tx.try_send(Trigger::Manual);
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    selected = clamp_selection(selected.saturating_sub(1), worker_count);
                    dirty = true;
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    selected = clamp_selection(selected + 1, worker_count);
                    dirty = true;
                }
                KeyCode::Char('u') => {
                    notice = Some("updating branches...".to_string());
                    dirty = true;
                    let _ = trigger_tx.try_send(Trigger::UpdateBranches);
                }
                KeyCode::Char('c') => {
                    notice = Some("cleaning up merged workers...".to_string());
                    dirty = true;
                    let _ = trigger_tx.try_send(Trigger::Cleanup);
                }
                KeyCode::Char('p') => {
                    let branch = current
                        .as_ref()
                        .and_then(|s| s.workers.get(selected))
                        .map(|w| w.branch.clone());
                    if let Some(branch) = branch {
                        notice = Some(format!("opening PR for {branch}..."));
                        dirty = true;
                        let _ = trigger_tx.try_send(Trigger::CreatePr(branch));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Keep the cursor inside the worker list as it shrinks or empties.
pub(crate) fn clamp_selection(selected: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        selected.min(len - 1)
    }
}

/// Redraw the whole screen. Raw mode needs explicit `\r\n` line endings.
fn draw(
    stdout: &mut std::io::Stdout,
    snapshot: &Snapshot,
    selected: usize,
    notice: Option<&str>,
    interval: u64,
) -> anyhow::Result<()> {
    execute!(stdout, cursor::MoveTo(0, 0), Clear(ClearType::All))?;

    let now = chrono::Local::now().format("%H:%M:%S");
    let header = cformat!(
        "<bold>warren</> <dim>on</> <cyan>{}</> <dim>· {} · every {}s</>",
        snapshot.default_branch,
        now,
        interval
    );
    write!(stdout, "{header}\r\n\r\n")?;

    if snapshot.workers.is_empty() {
        write!(stdout, "No active workers. Main worktree only.\r\n")?;
    } else {
        let table_header = cformat!(
            "  <bold>{:<24} {:>6} {:>6} {:<10} {:>5} {:>5}  {}</>",
            "WORKER", "AHEAD", "BEHIND", "DIR", "CI", "REV", "LAST COMMIT"
        );
        write!(stdout, "{table_header}\r\n")?;
        for (i, worker) in snapshot.workers.iter().enumerate() {
            let marker = if i == selected {
                cformat!("<cyan,bold>▸</>")
            } else {
                " ".to_string()
            };
            write!(stdout, "{marker} {}\r\n", list::row(worker))?;
        }
    }

    write!(stdout, "\r\n")?;
    if let Some(notice) = notice {
        let line = cformat!("<yellow>{notice}</>");
        write!(stdout, "{line}\r\n")?;
    }
    let help = cformat!(
        "<dim>q quit · r refresh · ↑/↓ select · u update · c cleanup · p pr</>"
    );
    write!(stdout, "{help}\r\n")?;
    stdout.flush()?;
    Ok(())
}

/// Plain fallback for terminals where raw mode is unavailable (CI logs,
/// dumb terminals). Clears the screen with an ANSI sequence and reprints.
pub fn run_simple(agg: &Aggregator, interval: u64) -> anyhow::Result<()> {
    loop {
        let snapshot = agg.refresh();
        print!("\x1b[2J\x1b[H");
        let now = chrono::Local::now().format("%H:%M:%S");
        println!("warren on {} · {} · every {interval}s", snapshot.default_branch, now);
        println!();
        list::render(&snapshot);
        std::thread::sleep(Duration::from_secs(interval.max(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_clamps_to_list_bounds() {
        assert_eq!(clamp_selection(0, 3), 0);
        assert_eq!(clamp_selection(2, 3), 2);
        assert_eq!(clamp_selection(5, 3), 2);
    }

    #[test]
    fn selection_resets_when_list_empties() {
        assert_eq!(clamp_selection(4, 0), 0);
    }
}
