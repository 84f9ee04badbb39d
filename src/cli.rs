//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Tier;
use crate::report::ReportFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// uxaudit - UX, accessibility and performance audits for web pages
///
/// Runs heuristic checks against a page and writes an HTML, JSON or
/// Markdown report with a prioritized list of fixes.
///
/// Examples:
///   uxaudit quick https://example.com
///   uxaudit deep https://example.com --format json
///   uxaudit element https://example.com "#checkout-form"
///   uxaudit batch pages.json --output ./reports
///   uxaudit monitor https://example.com --interval 60 --iterations 10
///   uxaudit setup
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory for reports and screenshots
    #[arg(short, long, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, global = true, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for uxaudit.config.json in the current directory
    #[arg(short, long, global = true, value_name = "FILE", env = "UXAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Navigation timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not capture screenshots
    #[arg(long, global = true)]
    pub no_screenshots: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fast checks: broken markup, basic accessibility, load performance
    Quick {
        /// Page URL (relative URLs resolve against baseUrl)
        url: String,
    },

    /// Quick checks plus full accessibility, performance, visual and mobile audits
    Deep { url: String },

    /// Deep analysis plus an audit in a mobile-emulated context
    Full { url: String },

    /// Checks scoped to the elements matching a CSS selector
    Element {
        url: String,
        /// CSS selector, e.g. "#checkout-form"
        selector: String,
    },

    /// Analyze every page listed in a batch file
    Batch {
        /// JSON file: { "pages": [{ "url", "type", "selector" }] }
        #[arg(value_name = "FILE")]
        config_path: PathBuf,
    },

    /// Re-run quick analyses at an interval and report regressions
    Monitor {
        url: String,

        /// Seconds between runs
        #[arg(long, default_value = "300", value_name = "SECS")]
        interval: u64,

        /// Stop after this many runs (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        iterations: Option<u32>,
    },

    /// Create output directories and a default uxaudit.config.json
    Setup,

    /// Deep-analyze baseUrl (or example.com) and write every report format
    Demo,
}

impl Command {
    /// The analysis tier of single-page commands.
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Command::Quick { .. } => Some(Tier::Quick),
            Command::Deep { .. } => Some(Tier::Deep),
            Command::Full { .. } => Some(Tier::Full),
            Command::Element { .. } => Some(Tier::Element),
            _ => None,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Command::Quick { url }
            | Command::Deep { url }
            | Command::Full { url }
            | Command::Element { url, .. }
            | Command::Monitor { url, .. }
                if url.trim().is_empty() =>
            {
                Err("URL must not be empty".to_string())
            }
            Command::Element { selector, .. } if selector.trim().is_empty() => {
                Err("Selector must not be empty".to_string())
            }
            Command::Monitor { interval: 0, .. } => {
                Err("Interval must be at least 1 second".to_string())
            }
            Command::Monitor {
                iterations: Some(0),
                ..
            } => Err("Iterations must be at least 1".to_string()),
            Command::Batch { config_path } if !config_path.exists() => Err(format!(
                "Batch file does not exist: {}",
                config_path.display()
            )),
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
