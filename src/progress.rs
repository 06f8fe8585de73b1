//! Progress reporting for harness runs
//!
//! Provides a live spinner using indicatif and styled header/summary blocks.
//! Everything here writes to the terminal only; per-case results go through
//! `report`.

use crate::harness::{HarnessProgress, HarnessResult};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner showing run status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &HarnessProgress) {
        self.bar.set_message(progress_message(progress));
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line status for the spinner
fn progress_message(progress: &HarnessProgress) -> String {
    format!(
        "Jobs: {} | Runs: {} | Rate: {:.1}/s | Pending: {} ({} queued) | Clean: {} | Bisected: {} | Failed: {} | Unknown: {} | Workers: {}",
        progress.jobs,
        format_number(progress.runs),
        progress.runs_per_second(),
        format_number(progress.pending as u64),
        format_number(progress.queued as u64),
        format_number(progress.clean_cases),
        format_number(progress.bisections),
        format_number(progress.failures as u64),
        format_number(progress.unknown_fingerprints),
        progress.total_workers,
    )
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the run
pub fn print_summary(result: &HarnessResult, output: Option<&str>) {
    let stats = &result.stats;
    let duration_secs = result.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.runs as f64 / duration_secs
    } else {
        0.0
    };

    let title = if result.passed() {
        style("Run Complete").green().bold()
    } else {
        style("Run Complete With Failures").red().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Jobs:").bold(), format_number(result.jobs as u64));
    eprintln!("  {} {}", style("Runs:").bold(), format_number(stats.runs));
    eprintln!("  {} {}", style("Bisections:").bold(), format_number(stats.bisections));
    eprintln!("  {} {}", style("Clean cases:").bold(), format_number(stats.clean_cases));
    eprintln!(
        "  {} {:.1}s ({:.1} runs/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if stats.unknown_fingerprints > 0 {
        eprintln!(
            "  {} {}",
            style("Unknown hashes:").yellow().bold(),
            format_number(stats.unknown_fingerprints)
        );
    }
    if stats.failures > 0 {
        eprintln!(
            "  {} {}",
            style("Failures:").red().bold(),
            format_number(stats.failures as u64)
        );
    }
    if let Some(path) = output {
        eprintln!("  {} {}", style("Step log:").bold(), path);
    }
    eprintln!();
}

/// Print a header at the start of the run
pub fn print_header(runner: &str, workers: usize, bot: Option<&str>) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("case-harness").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Runner:").bold(), runner);
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    if let Some(bot) = bot {
        eprintln!("  {} {}", style("Bot:").bold(), bot);
    }
    eprintln!();
}
