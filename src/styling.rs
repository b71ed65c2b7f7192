//! Terminal styling constants.
//!
//! Uses the anstyle ecosystem: anstream for auto-detecting color support,
//! anstyle for composable styling, plus a few semantic constants.
//!
//! All warren output goes to stdout; stderr is left for child-process
//! output. Use `styling::println!` for messages so color detection applies.

// Re-exports from anstream (auto-detecting output)
pub use anstream::{eprint, eprintln, print, println};

pub use anstyle::Style as AnstyleStyle;
use anstyle::{AnsiColor, Color};

pub const ERROR_EMOJI: &str = "❌";
pub const HINT_EMOJI: &str = "💡";
pub const INFO_EMOJI: &str = "ℹ️";
pub const SUCCESS_EMOJI: &str = "✅";

pub const ERROR: AnstyleStyle =
    AnstyleStyle::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
pub const WARNING: AnstyleStyle =
    AnstyleStyle::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
pub const SUCCESS: AnstyleStyle =
    AnstyleStyle::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
pub const ACCENT: AnstyleStyle =
    AnstyleStyle::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
pub const DIM: AnstyleStyle = AnstyleStyle::new().dimmed();
pub const BOLD: AnstyleStyle = AnstyleStyle::new().bold();
