//! Visual styling utilities for the CLI.
//!
//! Spinners for long-running operations and colour coding of verdicts,
//! errors and priorities.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use poverka_types::{TaskPriority, VerificationStatus};

// ============================================================================
// Progress Indicators
// ============================================================================

/// Standard spinner tick characters (Braille dots animation)
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Standard spinner tick interval
const SPINNER_TICK_MS: u64 = 80;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICK_CHARS)
}

/// Create a spinner for a generic operation.
pub fn operation_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Spinner only when stderr is a terminal and output is not suppressed.
pub fn maybe_spinner(message: &str, quiet: bool) -> Option<ProgressBar> {
    (!quiet && io::stderr().is_terminal()).then(|| operation_spinner(message))
}

// ============================================================================
// Colored Value Formatting
// ============================================================================

/// Verdict text coloured by outcome.
pub fn format_status_colored(status: VerificationStatus, no_color: bool) -> String {
    let text = status.verdict();
    if no_color {
        return text.to_string();
    }
    match status {
        VerificationStatus::Passed => format!("{}", text.green()),
        VerificationStatus::Failed => format!("{}", text.red()),
        VerificationStatus::Pending => format!("{}", text.yellow()),
    }
}

/// Error value in %, red with a marker when it exceeds the tolerance.
pub fn format_error_colored(value: f64, max_allowed: f64, no_color: bool) -> String {
    let exceeded = value.abs() > max_allowed;
    let text = if exceeded {
        format!("{:.2}*", value)
    } else {
        format!("{:.2}", value)
    };
    if no_color {
        text
    } else if exceeded {
        format!("{}", text.red())
    } else {
        format!("{}", text.green())
    }
}

pub fn format_priority_colored(priority: TaskPriority, no_color: bool) -> String {
    let text = priority.to_string();
    if no_color {
        return text;
    }
    match priority {
        TaskPriority::Normal => text,
        TaskPriority::High => format!("{}", text.yellow()),
        TaskPriority::Urgent => format!("{}", text.red()),
    }
}

/// Completion mark for task tables.
pub fn format_done(completed: bool, no_color: bool) -> String {
    match (completed, no_color) {
        (true, true) => "[x]".to_string(),
        (false, true) => "[ ]".to_string(),
        (true, false) => format!("{}", "✓".green()),
        (false, false) => "·".to_string(),
    }
}

/// Dim text, used for finished items.
pub fn dimmed(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("{}", text.dimmed())
    }
}

/// Human-readable file size.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
