//! Pure formatting functions for UI output.
//!
//! `format_*` functions build the text and are testable; `display_*`
//! functions print it. Styling goes through `console`, which drops colors
//! when the stream is not a terminal.

use console::style;

use crate::boundary::BoundaryWarning;
use crate::cli::ReleaseOutcome;
use crate::domain::SemVer;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Current version and branch, one line
pub fn format_version(version: &SemVer, branch: &str) -> String {
    let kind = if version.is_release() {
        "release"
    } else {
        "pre-release"
    };
    format!("{} ({}) on branch '{}'", version, kind, branch)
}

pub fn display_version(version: &SemVer, branch: &str) {
    println!("{}", format_version(version, branch));
}

/// Version change `from -> to`
pub fn format_transition(from: &SemVer, to: &SemVer) -> String {
    format!("{} -> {}", style(from).red(), style(to).green())
}

/// Summary of a completed release run
pub fn format_release(release: &SemVer, develop: &str, next_snapshot: Option<&SemVer>) -> Vec<String> {
    let mut lines = vec![format!("Released and tagged {}", style(release).green().bold())];
    match next_snapshot {
        Some(next) => lines.push(format!(
            "Branch '{}' continues at {}",
            develop,
            style(next).cyan()
        )),
        None => lines.push(format!("Branch '{}' was not bumped", develop)),
    }
    lines
}

/// Print the outcome of the release workflow
pub fn display_release(outcome: &ReleaseOutcome, develop: &str) {
    match outcome {
        ReleaseOutcome::Released {
            release,
            next_snapshot,
        } => {
            for line in format_release(release, develop, next_snapshot.as_ref()) {
                display_success(&line);
            }
        }
        ReleaseOutcome::Skipped(warning) => display_boundary_warning(warning),
    }
}
