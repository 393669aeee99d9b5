//! CLI output formatting for shot lists and session progress.
//!
//! # Information-First Display
//!
//! The primary display for a shot is the file it will be saved as, with the
//! item details as indented context lines. Empty details show as `N/A` so
//! the operator can tell "blank in the sheet" from "not shown".
//!
//! # Output Format
//!
//! ## Shot list (`check`)
//!
//! ```text
//! Shots (2)
//! 001 A1-front.jpg
//!     Item ID: A1
//!     Color: red
//!     View: front
//! 002 B2-side.jpg
//!     Item ID: B2
//!     Color: N/A
//!     View: side
//!
//! Skipped rows
//!     Row 3: missing filename
//! ```
//!
//! ## Session (`run`)
//!
//! ```text
//! Shot 1 of 2 (0 completed)
//!     Item ID: A1
//!     Color: red
//!     View: front
//!     File: A1-front.jpg
//!     Status: image captured
//!     Preview: /tmp/.tmpX/preview-1.jpg
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::ingest::IngestReport;
use crate::session::{SessionStatus, Snapshot};
use crate::types::Shot;

const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { NOT_AVAILABLE } else { value }
}

/// Item detail lines shared by the list and session views.
fn detail_lines(shot: &Shot, depth: usize) -> Vec<String> {
    let pad = indent(depth);
    vec![
        format!("{pad}Item ID: {}", or_na(&shot.item_id)),
        format!("{pad}Color: {}", or_na(&shot.item_color)),
        format!("{pad}View: {}", or_na(&shot.view_type)),
    ]
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Shot list
// ============================================================================

pub fn format_shot_list(report: &IngestReport) -> Vec<String> {
    let mut lines = vec![format!("Shots ({})", report.shots.len())];
    for (i, shot) in report.shots.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), shot.filename));
        lines.extend(detail_lines(shot, 1));
    }

    if !report.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped rows".to_string());
        for skipped in &report.skipped {
            lines.push(format!("{}Row {}: {}", indent(1), skipped.row, skipped.reason));
        }
    }
    lines
}

pub fn print_shot_list(report: &IngestReport) {
    for line in format_shot_list(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Session progress
// ============================================================================

/// `Shot N of M`, 1-based. `None` when there is no current shot.
pub fn progress_label(snapshot: &Snapshot) -> Option<String> {
    let index = snapshot.current_index?;
    if index >= snapshot.total {
        return None;
    }
    Some(format!("Shot {} of {}", index + 1, snapshot.total))
}

pub fn format_snapshot(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();

    match (snapshot.status, &snapshot.current_shot) {
        (SessionStatus::Finished, _) => {
            lines.push(format!(
                "Finished: {} captured",
                plural(snapshot.completed, "shot", "shots")
            ));
            if let Some(method) = snapshot.save_method {
                lines.push(format!("{}Last saved via {}", indent(1), method));
            }
        }
        (SessionStatus::Idle, _) => lines.push("No shot list loaded".to_string()),
        (status, None) => lines.push(format!("Status: {}", status)),
        (status, Some(shot)) => {
            let label = progress_label(snapshot).unwrap_or_default();
            lines.push(format!("{label} ({} completed)", snapshot.completed));
            lines.extend(detail_lines(shot, 1));
            lines.push(format!("{}File: {}", indent(1), shot.filename));
            lines.push(format!("{}Status: {}", indent(1), status));
            if let Some(preview) = &snapshot.preview {
                lines.push(format!("{}Preview: {}", indent(1), preview));
            }
            if snapshot.completed > 0
                && let Some(method) = snapshot.save_method
            {
                lines.push(format!("{}Last saved via {}", indent(1), method));
            }
        }
    }

    if let Some(error) = &snapshot.error {
        lines.push(format!("Error: {}", error));
    }
    lines
}

pub fn print_snapshot(snapshot: &Snapshot) {
    for line in format_snapshot(snapshot) {
        println!("{}", line);
    }
}
