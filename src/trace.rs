//! Timestamped progress lines for the long-running loop/daemon commands.
//!
//! Mirrors the styled, timestamped status line the original tool prints while
//! polling (`[HH:MM:SS] message`), layered on top of the `log` facade so the
//! same event also lands in whatever `RUST_LOG` sink the user configured.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::styling::{self, eprintln};

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress `trace::progress` output (but not `log::*` calls).
///
/// Used by tests and by `--quiet` so the cooperative loop can still be
/// exercised without spamming stderr.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn now_hms() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Emit a dimmed, timestamped progress line to stderr and mirror it at `info`.
///
/// This is the primary way the loop driver communicates "still alive, here's
/// what I just did" without requiring `-v`.
pub fn progress(message: &str) {
    log::info!("{message}");
    if QUIET.load(Ordering::Relaxed) {
        return;
    }
    eprintln!("{}", styling::dim(&format!("[{}] {message}", now_hms())));
}

/// Emit a progress line only when verbosity is at least 1 (`-v`).
pub fn verbose(message: &str) {
    log::debug!("{message}");
    if QUIET.load(Ordering::Relaxed) || styling::verbosity() < 1 {
        return;
    }
    eprintln!("{}", styling::dim(&format!("[{}] {message}", now_hms())));
}

/// Emit a warning line: always shown (unless quiet), styled distinctly.
pub fn warn(message: &str) {
    log::warn!("{message}");
    if QUIET.load(Ordering::Relaxed) {
        return;
    }
    eprintln!("{}", styling::format_warning(&format!("[{}] {message}", now_hms())));
}
