//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `uxaudit.config.json` (or a `.toml` equivalent).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "uxaudit.config.json";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL used by `demo` and as a prefix for relative batch URLs.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Directory reports and screenshots are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Which analyzers are enabled.
    #[serde(default)]
    pub analysis: AnalysisToggles,

    /// Severity and performance thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Browser session settings.
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            output_dir: default_output_dir(),
            analysis: AnalysisToggles::default(),
            thresholds: Thresholds::default(),
            browser: BrowserConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

fn default_output_dir() -> String {
    "./uxaudit-reports".to_string()
}

/// Analyzer switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisToggles {
    #[serde(default = "default_true")]
    pub accessibility: bool,
    #[serde(default = "default_true")]
    pub performance: bool,
    #[serde(default = "default_true")]
    pub visual: bool,
    #[serde(default = "default_true")]
    pub mobile: bool,
    #[serde(default = "default_true")]
    pub bugs: bool,
    /// Capture one screenshot per analyzed page.
    #[serde(default = "default_true")]
    pub screenshots: bool,
}

impl Default for AnalysisToggles {
    fn default() -> Self {
        Self {
            accessibility: true,
            performance: true,
            visual: true,
            mobile: true,
            bugs: true,
            screenshots: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Thresholds the analyzers compare measurements against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Page load time above which a high issue is reported (ms).
    #[serde(default = "default_load_time_ms")]
    pub load_time_ms: u64,

    /// Element count above which the DOM is considered oversized.
    #[serde(default = "default_dom_size")]
    pub dom_size: usize,

    /// Document size above which a transfer-size issue is reported (bytes).
    #[serde(default = "default_page_weight")]
    pub page_weight_bytes: u64,

    /// Blocking scripts tolerated in `<head>`.
    #[serde(default = "default_blocking_scripts")]
    pub blocking_scripts: usize,

    /// Minimum touch target edge (CSS px).
    #[serde(default = "default_touch_target")]
    pub touch_target_px: u32,

    /// Minimum readable font size (CSS px).
    #[serde(default = "default_min_font_size")]
    pub min_font_size_px: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            load_time_ms: default_load_time_ms(),
            dom_size: default_dom_size(),
            page_weight_bytes: default_page_weight(),
            blocking_scripts: default_blocking_scripts(),
            touch_target_px: default_touch_target(),
            min_font_size_px: default_min_font_size(),
        }
    }
}

fn default_load_time_ms() -> u64 {
    3000
}

fn default_dom_size() -> usize {
    1500
}

fn default_page_weight() -> u64 {
    500 * 1024
}

fn default_blocking_scripts() -> usize {
    2
}

fn default_touch_target() -> u32 {
    44
}

fn default_min_font_size() -> u32 {
    12
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Navigation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_desktop_viewport")]
    pub desktop_viewport: ViewportSize,

    #[serde(default = "default_mobile_viewport")]
    pub mobile_viewport: ViewportSize,

    #[serde(default = "default_desktop_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_mobile_user_agent")]
    pub mobile_user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            desktop_viewport: default_desktop_viewport(),
            mobile_viewport: default_mobile_viewport(),
            user_agent: default_desktop_user_agent(),
            mobile_user_agent: default_mobile_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_desktop_viewport() -> ViewportSize {
    ViewportSize {
        width: 1920,
        height: 1080,
    }
}

fn default_mobile_viewport() -> ViewportSize {
    ViewportSize {
        width: 375,
        height: 667,
    }
}

fn default_desktop_user_agent() -> String {
    format!("uxaudit/{} (desktop)", env!("CARGO_PKG_VERSION"))
}

fn default_mobile_user_agent() -> String {
    format!(
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) uxaudit/{} Mobile",
        env!("CARGO_PKG_VERSION")
    )
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Default format when `--format` is not given.
    #[serde(default = "default_format")]
    pub format: String,

    /// Issues listed per category in the HTML dashboard.
    #[serde(default = "default_max_listed")]
    pub max_issues_per_category: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            max_issues_per_category: default_max_listed(),
        }
    }
}

fn default_format() -> String {
    "html".to_string()
}

fn default_max_listed() -> usize {
    50
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let config: Config = if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.output_dir = output.display().to_string();
        }

        if let Some(timeout) = args.timeout {
            self.browser.timeout_seconds = timeout;
        }

        if let Some(format) = args.format {
            self.report.format = format.as_str().to_string();
        }

        if args.no_screenshots {
            self.analysis.screenshots = false;
        }
    }

    /// Resolves a possibly relative URL against `baseUrl`.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }

        match self.base_url.as_deref().map(url::Url::parse) {
            Some(Ok(base)) => base
                .join(target)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| target.to_string()),
            _ => target.to_string(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_json() -> String {
        let config = Config::default();
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
