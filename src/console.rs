//! Terminal output for the binary: progress spinner and run summaries.

use crate::models::{AnalysisResult, Severity};
use crate::report::summary_of;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Spinner shown while an analysis runs; hidden in quiet mode.
pub fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a red error line to stderr.
pub fn print_error(message: &str) {
    eprintln!("\x1b[31m❌ Error: {}\x1b[0m", message);
}

/// Prints the severity counts, score, fix time and priority actions of a run.
pub fn print_summary(result: &AnalysisResult, report: Option<&Path>, quiet: bool) {
    if quiet {
        return;
    }

    let summary = summary_of(result);

    println!("\n📊 Analysis Summary: {} ({})", result.url, result.tier);
    println!("   Overall score: {}/100", summary.overall_score);
    println!("   Total issues: {}", summary.total_issues);
    println!(
        "   - {} Critical: {} | {} High: {} | {} Medium: {} | {} Low: {}",
        Severity::Critical.emoji(),
        summary.critical_issues,
        Severity::High.emoji(),
        summary.high_issues,
        Severity::Medium.emoji(),
        summary.medium_issues,
        Severity::Low.emoji(),
        summary.low_issues
    );
    println!(
        "   Recommendations: {} ({} quick wins)",
        summary.total_recommendations, summary.quick_wins
    );
    println!("   Estimated fix time: {} min", summary.estimated_fix_time);
    println!("   Duration: {:.1}s", result.elapsed_ms as f64 / 1000.0);

    if !summary.priority_actions.is_empty() {
        println!("\n🎯 Priority actions:");
        for (i, action) in summary.priority_actions.iter().enumerate() {
            println!("   {}. {}", i + 1, action.title);
            if !action.action.is_empty() {
                println!("      → {}", action.action);
            }
        }
    }

    if let Some(path) = report {
        println!("\n✅ Report saved to: {}", path.display());
    }
}
