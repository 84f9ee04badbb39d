//! Report generation.
//!
//! Reporters turn a finalized result into a document. Writing a report
//! never touches the result and never overwrites an existing file.

pub mod html;
pub mod json;
pub mod markdown;

use crate::analysis::summarize;
use crate::error::ReportError;
use crate::models::{AnalysisResult, Summary};
use chrono::Utc;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub use html::HtmlReporter;
pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ReportFormat {
    /// Self-contained HTML dashboard
    Html,
    /// JSON with derived blocks
    Json,
    /// Markdown document
    Markdown,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Html, ReportFormat::Json, ReportFormat::Markdown];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "markdown",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }

    /// Parses a format name as written in config files.
    pub fn parse(name: &str) -> Result<Self, ReportError> {
        match name.trim().to_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders an analysis result in one format.
pub trait Reporter: Send + Sync {
    fn format(&self) -> ReportFormat;

    fn render(&self, result: &AnalysisResult) -> Result<String, ReportError>;
}

/// One reporter per format, each listing at most `max_listed` issues per category.
pub fn default_reporters(max_listed: usize) -> Vec<Arc<dyn Reporter>> {
    vec![
        Arc::new(HtmlReporter::new(max_listed)),
        Arc::new(JsonReporter),
        Arc::new(MarkdownReporter::new(max_listed)),
    ]
}

/// Summary of `result`, computed when the result was never finalized.
pub(crate) fn summary_of(result: &AnalysisResult) -> Summary {
    result.summary.clone().unwrap_or_else(|| summarize(result))
}

fn host_slug(url: &str) -> String {
    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "page".to_string());

    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Base file name for a report: `uxaudit-<tier>-<host>-<utc millis>`.
pub fn report_stem(result: &AnalysisResult) -> String {
    format!(
        "uxaudit-{}-{}-{}",
        result.tier,
        host_slug(&result.url),
        Utc::now().format("%Y%m%d-%H%M%S%3f")
    )
}

/// Writes `contents` to `<dir>/<stem>.<ext>`, adding a numeric suffix
/// instead of replacing a file that already exists.
pub async fn write_unique(
    dir: &Path,
    stem: &str,
    extension: &str,
    contents: &[u8],
) -> Result<PathBuf, ReportError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut attempt = 0;
    loop {
        let name = if attempt == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}-{}.{}", stem, attempt, extension)
        };
        let path = dir.join(name);

        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        match opened {
            Ok(mut file) => {
                file.write_all(contents)
                    .await
                    .map_err(|source| ReportError::Io {
                        path: path.clone(),
                        source,
                    })?;
                file.flush().await.map_err(|source| ReportError::Io {
                    path: path.clone(),
                    source,
                })?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", path.display());
                attempt += 1;
            }
            Err(source) => return Err(ReportError::Io { path, source }),
        }
    }
}

/// Renders `result` with `reporter` and writes it into `output_dir`.
pub async fn write_report(
    reporter: &dyn Reporter,
    result: &AnalysisResult,
    output_dir: &Path,
) -> Result<PathBuf, ReportError> {
    let format = reporter.format();
    let rendered = reporter.render(result)?;
    let path = write_unique(
        output_dir,
        &report_stem(result),
        format.extension(),
        rendered.as_bytes(),
    )
    .await?;

    info!("Wrote {} report to {}", format, path.display());
    Ok(path)
}
