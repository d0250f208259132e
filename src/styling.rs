//! Minimal terminal styling.
//!
//! Trimmed down from the teacher's multi-file `styling` module (which also
//! carried TOML syntax highlighting, hyperlinks, and text-wrapping for a
//! TUI picker) to the handful of primitives this crate's CLI output needs:
//! auto-detecting color support, a couple of semantic colors, and the
//! stdout/stderr separation convention.
//!
//! ## stdout vs stderr
//!
//! - **stdout**: machine-readable/status-report output (`gai work --status`)
//! - **stderr**: progress and diagnostic messages (the loop driver, warnings)
//!
//! This lets `gai work --status | jq` work without progress lines polluting
//! the pipe. Use `println!`/`print!` for stdout, `eprintln!`/`eprint!` for
//! stderr.

pub use anstream::{eprint, eprintln, print, println};
use anstyle::{AnsiColor, Style};

use std::sync::atomic::{AtomicU8, Ordering};

/// Global verbosity level, set once at startup from `-v`/`-vv`.
static VERBOSITY: AtomicU8 = AtomicU8::new(0);

/// Set the global verbosity level. Call once, after parsing CLI arguments.
pub fn set_verbosity(level: u8) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

/// Current verbosity level: 0 = normal, 1 = verbose (`-v`), 2+ = debug (`-vv`).
pub fn verbosity() -> u8 {
    VERBOSITY.load(Ordering::Relaxed)
}

const DIM: Style = Style::new().dimmed();
const ERROR: Style = Style::new().fg_color(Some(AnsiColor::Red.into()));
const WARNING: Style = Style::new().fg_color(Some(AnsiColor::Yellow.into()));
const SUCCESS: Style = Style::new().fg_color(Some(AnsiColor::Green.into()));
const RUNNING: Style = Style::new().fg_color(Some(AnsiColor::Cyan.into()));

/// Dim a string for low-priority progress output.
pub fn dim(s: &str) -> String {
    format!("{DIM}{s}{DIM:#}")
}

/// Format a message as a standard error line (`✗ message`).
pub fn format_error(message: &str) -> String {
    format!("{ERROR}✗ {message}{ERROR:#}")
}

/// Format a message as a standard warning line (`⚠ message`).
pub fn format_warning(message: &str) -> String {
    format!("{WARNING}⚠ {message}{WARNING:#}")
}

/// Format a message as a standard success line (`✓ message`).
pub fn format_success(message: &str) -> String {
    format!("{SUCCESS}✓ {message}{SUCCESS:#}")
}

/// Format a message to flag something currently running.
pub fn format_running(message: &str) -> String {
    format!("{RUNNING}● {message}{RUNNING:#}")
}
