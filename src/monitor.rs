//! Monitoring mode.
//!
//! Repeats quick analyses of one page at a fixed interval. A report is
//! written for the first run and whenever the critical issue count rises
//! above the previous run's.

use crate::models::Tier;
use crate::orchestrator::{AnalyzeOptions, Orchestrator};
use crate::report::{self, ReportFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Settings for a monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub interval: Duration,
    /// `None` runs until Ctrl-C.
    pub iterations: Option<u32>,
    pub format: ReportFormat,
    pub output_dir: PathBuf,
    pub quiet: bool,
}

/// One monitoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRun {
    pub iteration: u32,
    pub at: DateTime<Utc>,
    pub overall_score: u8,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub error: Option<String>,
    pub report: Option<PathBuf>,
}

/// Totals of a monitoring session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStats {
    pub runs: u32,
    pub reports: u32,
    pub last: Option<MonitorRun>,
}

/// Whether a run warrants a report.
pub fn should_report(previous_critical: Option<usize>, critical: usize) -> bool {
    match previous_critical {
        None => true,
        Some(previous) => critical > previous,
    }
}

fn print_run(run: &MonitorRun, quiet: bool) {
    if quiet {
        return;
    }

    let status = match (&run.error, run.report.is_some()) {
        (Some(e), _) => format!("⚠️  {}", e),
        (None, true) if run.iteration > 1 => "🚨 critical issues increased".to_string(),
        _ => "✅".to_string(),
    };
    println!(
        "[{}] #{} score {}/100, {} issue(s), {} critical {}",
        run.at.format("%H:%M:%S"),
        run.iteration,
        run.overall_score,
        run.total_issues,
        run.critical_issues,
        status
    );
    if let Some(ref path) = run.report {
        println!("   Report saved to: {}", path.display());
    }
}

async fn analyze_once(
    orchestrator: &Orchestrator,
    url: &str,
    iteration: u32,
    previous_critical: Option<usize>,
    options: &MonitorOptions,
) -> Result<MonitorRun> {
    let analyze = AnalyzeOptions {
        selector: None,
        screenshot: false,
    };
    let result = orchestrator.analyze_page(url, Tier::Quick, &analyze).await?;
    let summary = report::summary_of(&result);

    let report = if result.error.is_none()
        && should_report(previous_critical, summary.critical_issues)
    {
        Some(
            orchestrator
                .generate_report(&result, options.format, &options.output_dir)
                .await
                .context("Failed to write monitoring report")?,
        )
    } else {
        None
    };

    Ok(MonitorRun {
        iteration,
        at: Utc::now(),
        overall_score: summary.overall_score,
        total_issues: summary.total_issues,
        critical_issues: summary.critical_issues,
        error: result.error,
        report,
    })
}

/// Runs the monitoring loop until the iteration limit or Ctrl-C.
pub async fn run(orchestrator: &Orchestrator, url: &str, options: &MonitorOptions) -> Result<MonitorStats> {
    info!(
        "Monitoring {} every {}s",
        url,
        options.interval.as_secs_f64()
    );

    let mut stats = MonitorStats::default();
    let mut previous_critical: Option<usize> = None;

    loop {
        let iteration = stats.runs + 1;
        let run = analyze_once(orchestrator, url, iteration, previous_critical, options).await?;
        print_run(&run, options.quiet);

        if run.error.is_none() {
            previous_critical = Some(run.critical_issues);
        } else {
            warn!("Run #{} could not load the page", iteration);
        }
        stats.runs = iteration;
        if run.report.is_some() {
            stats.reports += 1;
        }
        stats.last = Some(run);

        if options.iterations.is_some_and(|max| iteration >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(options.interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping monitor");
                break;
            }
        }
    }

    Ok(stats)
}

/// Output directory for monitoring reports.
pub fn reports_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("monitor")
}
