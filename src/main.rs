//! uxaudit - UX, accessibility and performance page auditor
//!
//! A CLI tool that loads web pages, runs heuristic analyzers against them
//! and writes prioritized audit reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error, page could not be loaded, or critical issues
//!       found by a quick analysis

mod analysis;
mod analyzers;
mod batch;
mod browser;
mod cli;
mod config;
mod console;
mod error;
mod models;
mod monitor;
mod orchestrator;
mod report;
#[cfg(test)]
mod testing;

use anyhow::{bail, Context, Result};
use cli::{Args, Command};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{AnalysisResult, Tier};
use orchestrator::{AnalyzeOptions, Orchestrator};
use report::ReportFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const DEMO_URL: &str = "https://example.com";

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        console::print_error(&e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(&args);

    info!("uxaudit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            console::print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the subcommand. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    match args.command.clone() {
        Command::Setup => handle_setup(&args, &config),
        Command::Demo => handle_demo(&args, &config).await,
        Command::Batch { config_path } => handle_batch(&args, &config, &config_path).await,
        Command::Monitor {
            url,
            interval,
            iterations,
        } => handle_monitor(&args, &config, &url, interval, iterations).await,
        Command::Element { url, selector } => {
            run_single(&args, &config, &url, Tier::Element, AnalyzeOptions::with_selector(selector)).await
        }
        Command::Quick { url } | Command::Deep { url } | Command::Full { url } => {
            let tier = args.command.tier().unwrap_or(Tier::Quick);
            run_single(&args, &config, &url, tier, AnalyzeOptions::default()).await
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        if matches!(args.command, Command::Setup) && !config_path.exists() {
            return Ok(Config::default());
        }
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

fn report_format(config: &Config) -> Result<ReportFormat> {
    ReportFormat::parse(&config.report.format).context("Invalid report format in configuration")
}

/// Resolves `target` against `baseUrl` and checks it is an http(s) URL.
fn page_url(config: &Config, target: &str) -> Result<String> {
    let resolved = config.resolve_url(target);
    let parsed = url::Url::parse(&resolved).with_context(|| format!("Invalid URL: {}", target))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("URL must start with 'http://' or 'https://': {}", target);
    }
    Ok(resolved)
}

async fn start_session(config: &Config) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::with_defaults(config.clone());
    orchestrator
        .initialize()
        .await
        .context("Failed to launch the browser session")?;
    Ok(orchestrator)
}

async fn end_session(orchestrator: &Orchestrator) {
    if let Err(e) = orchestrator.close().await {
        warn!("Failed to close the browser session: {}", e);
    }
}

async fn analyze_with_spinner(
    orchestrator: &Orchestrator,
    args: &Args,
    url: &str,
    tier: Tier,
    options: &AnalyzeOptions,
) -> Result<AnalysisResult> {
    let spinner = console::spinner(args.quiet, format!("Running {} analysis of {}", tier, url));
    let outcome = orchestrator.analyze_page(url, tier, options).await;
    spinner.finish_and_clear();
    Ok(outcome?)
}

/// Run one tier against one page and write its report.
async fn run_single(
    args: &Args,
    config: &Config,
    target: &str,
    tier: Tier,
    options: AnalyzeOptions,
) -> Result<i32> {
    let url = page_url(config, target)?;
    let format = report_format(config)?;

    if !args.quiet {
        println!("🔬 Running {} analysis of {}", tier, url);
    }

    let orchestrator = start_session(config).await?;
    let outcome = analyze_with_spinner(&orchestrator, args, &url, tier, &options).await;
    end_session(&orchestrator).await;
    let result = outcome?;

    let path = orchestrator
        .generate_report(&result, format, Path::new(&config.output_dir))
        .await
        .context("Failed to write report")?;

    console::print_summary(&result, Some(&path), args.quiet);

    if let Some(ref e) = result.error {
        console::print_error(e);
        return Ok(1);
    }

    if tier == Tier::Quick && result.has_critical_issues() {
        if !args.quiet {
            eprintln!("\n⛔ Critical issues found (exit code 1).");
        }
        return Ok(1);
    }

    Ok(0)
}

/// Analyze every page of a batch file.
async fn handle_batch(args: &Args, config: &Config, batch_path: &Path) -> Result<i32> {
    let batch_file = batch::BatchFile::load(batch_path)?;
    let format = report_format(config)?;
    let output_dir = PathBuf::from(&config.output_dir);

    if !args.quiet {
        println!(
            "📋 Running batch of {} page(s) from {}",
            batch_file.pages.len(),
            batch_path.display()
        );
    }

    let orchestrator = start_session(config).await?;
    let spinner = console::spinner(args.quiet, "Analyzing batch".to_string());
    let outcome = batch::run(&orchestrator, config, &batch_file, format, &output_dir).await;
    spinner.finish_and_clear();
    end_session(&orchestrator).await;
    let summary = outcome?;

    let summary_path = summary.write(&output_dir).await?;

    if !args.quiet {
        println!("\n📊 Batch Summary:");
        println!("   Pages: {}", summary.total_pages);
        println!("   Total issues: {}", summary.total_issues);
        println!("   Critical issues: {}", summary.critical_issues);
        for entry in &summary.results {
            let status = entry.error.as_deref().unwrap_or("ok");
            println!(
                "   - {} ({}): score {}/100, {} issue(s) [{}]",
                entry.url, entry.tier, entry.overall_score, entry.total_issues, status
            );
        }
        println!("\n✅ Batch summary saved to: {}", summary_path.display());
    }

    Ok(if summary.failed_pages > 0 { 1 } else { 0 })
}

/// Repeated quick analyses of one page.
async fn handle_monitor(
    args: &Args,
    config: &Config,
    target: &str,
    interval: u64,
    iterations: Option<u32>,
) -> Result<i32> {
    let url = page_url(config, target)?;
    let options = monitor::MonitorOptions {
        interval: Duration::from_secs(interval),
        iterations,
        format: report_format(config)?,
        output_dir: monitor::reports_dir(Path::new(&config.output_dir)),
        quiet: args.quiet,
    };

    if !args.quiet {
        println!("👀 Monitoring {} every {}s (Ctrl-C to stop)", url, interval);
    }

    let orchestrator = start_session(config).await?;
    let outcome = monitor::run(&orchestrator, &url, &options).await;
    end_session(&orchestrator).await;
    let stats = outcome?;

    if !args.quiet {
        println!(
            "\n✅ Monitoring finished after {} run(s), {} report(s) written.",
            stats.runs, stats.reports
        );
        if let Some(ref last) = stats.last {
            println!(
                "   Last run: score {}/100, {} critical issue(s)",
                last.overall_score, last.critical_issues
            );
        }
    }
    Ok(0)
}

/// Create output directories and a default configuration file.
fn handle_setup(args: &Args, config: &Config) -> Result<i32> {
    let output_dir = PathBuf::from(&config.output_dir);
    let screenshots = output_dir.join("screenshots");
    std::fs::create_dir_all(&screenshots)
        .with_context(|| format!("Failed to create {}", screenshots.display()))?;
    println!("📁 Output directory ready: {}", output_dir.display());

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if config_path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config_path.display()
        );
        return Ok(1);
    }

    std::fs::write(&config_path, Config::default_json())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("✅ Created {} with default settings.", config_path.display());
    println!("   Edit it to set baseUrl, thresholds, viewports and report defaults.");
    Ok(0)
}

/// Deep analysis of baseUrl (or example.com) written in every format.
async fn handle_demo(args: &Args, config: &Config) -> Result<i32> {
    let target = config.base_url.clone().unwrap_or_else(|| DEMO_URL.to_string());
    let url = page_url(config, &target)?;

    if !args.quiet {
        println!("🎬 Demo: deep analysis of {}", url);
    }

    let orchestrator = start_session(config).await?;
    let outcome =
        analyze_with_spinner(&orchestrator, args, &url, Tier::Deep, &AnalyzeOptions::default()).await;
    end_session(&orchestrator).await;
    let result = outcome?;

    let output_dir = PathBuf::from(&config.output_dir);
    let mut paths = Vec::new();
    for format in ReportFormat::ALL {
        let path = orchestrator
            .generate_report(&result, format, &output_dir)
            .await
            .with_context(|| format!("Failed to write {} report", format))?;
        paths.push(path);
    }

    console::print_summary(&result, None, args.quiet);
    if !args.quiet {
        println!("\n✅ Reports saved:");
        for path in &paths {
            println!("   - {}", path.display());
        }
    }

    if let Some(ref e) = result.error {
        console::print_error(e);
        return Ok(1);
    }
    Ok(0)
}
