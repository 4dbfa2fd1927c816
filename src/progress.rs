//! Progress reporting for the size computation
//!
//! Provides a spinner while the worker pool runs and styled header and
//! summary blocks around it.

use std::time::Duration;

use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use crate::sizer::SizeReport;

/// Progress reporter that displays computation status
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

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the computation
pub fn print_header(source: &str, workers: usize, locators: &[String]) {
    println!();
    println!(
        "{} {}",
        style("blobsize").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Account:").bold(), source);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Locators:").bold(), locators.join(", "));
    println!();
}

/// Print a summary of the computation results
pub fn print_summary(report: &SizeReport, source: &str, source_size: Option<u64>) {
    println!();
    println!("{}", style("Size Computation Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Containers:").bold(),
        format_number(report.containers_sized)
    );
    println!(
        "  {} {}",
        style("Blobs:").bold(),
        format_number(report.blob_count)
    );
    println!(
        "  {} {} ({} bytes)",
        style("Total Size:").bold(),
        report.format_total(),
        format_number(report.total_bytes.max(0) as u64)
    );
    println!(
        "  {} {:.1}s",
        style("Duration:").bold(),
        report.duration.as_secs_f64()
    );
    if report.retries > 0 {
        println!(
            "  {} {}",
            style("Retries:").yellow().bold(),
            format_number(report.retries)
        );
    }
    // Show the account source with size if available
    if let Some(size) = source_size {
        println!(
            "  {} {} ({})",
            style("Source:").bold(),
            source,
            format_size(size, BINARY)
        );
    } else {
        println!("  {} {}", style("Source:").bold(), source);
    }
    println!();
}
