//! Terminal rendering of task outcomes and history rows.

use chrono::{DateTime, Local};
use colored::Colorize;
use invc_core::{InvestigationRecord, TaskOutcome};
use std::time::Duration;

const RULE_WIDTH: usize = 60;

/// Banner printed when a task starts.
pub fn header(action: &str, target: &str, now: DateTime<Local>) -> String {
    format!(
        "{}: {}\nTime: {}\n{}\n",
        action,
        target,
        now.format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(RULE_WIDTH)
    )
}

/// Text body for a delivered outcome.
///
/// `noun` names the activity ("Analysis", "Investigation") in failure messages.
pub fn outcome_body(outcome: &TaskOutcome, noun: &str, timeout: Duration) -> String {
    match outcome {
        TaskOutcome::Success { stdout, stderr, .. } => {
            let mut body = stdout.clone();
            if !stderr.is_empty() {
                body.push_str("\nErrors:\n");
                body.push_str(stderr);
            }
            body
        }
        TaskOutcome::TimedOut => format!("{} timed out after {}.", noun, humanize(timeout)),
        TaskOutcome::LaunchFailed { message } => {
            format!("Error running {}: {}", noun.to_lowercase(), message)
        }
    }
}

/// Print a delivered outcome under a short banner naming the target.
pub fn print_outcome(target: &str, outcome: &TaskOutcome, noun: &str, timeout: Duration) {
    let status = match outcome {
        TaskOutcome::Success { exit_code: Some(0), .. } => "done".green(),
        TaskOutcome::Success { exit_code, .. } => match exit_code {
            Some(code) => format!("exit {}", code).yellow(),
            None => "killed by signal".yellow(),
        },
        TaskOutcome::TimedOut => "timed out".red(),
        TaskOutcome::LaunchFailed { .. } => "failed".red(),
    };

    println!("{} {} [{}]", "▸".cyan(), target.bold(), status);
    let body = outcome_body(outcome, noun, timeout);
    if body.ends_with('\n') {
        print!("{}", body);
    } else {
        println!("{}", body);
    }
    println!();
}

/// "5 minutes", "1 minute", "90 seconds"
pub fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if secs >= 60 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}

/// Columns of the history table: Date, Type, Target, Status.
pub fn record_row(record: &InvestigationRecord) -> [String; 4] {
    [
        record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        record.kind.to_string(),
        record.label.clone(),
        "Complete".to_string(),
    ]
}
