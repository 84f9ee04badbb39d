//! Batch analysis.
//!
//! A batch file lists pages with their analysis type. Pages run one at a
//! time through a shared orchestrator; each gets its own report and the
//! batch ends with a summary JSON next to the reports.

use crate::config::Config;
use crate::models::Tier;
use crate::orchestrator::{AnalyzeOptions, Orchestrator};
use crate::report::{self, ReportFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Contents of a batch file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchFile {
    pub pages: Vec<BatchPage>,
}

/// One page to analyze.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchPage {
    pub url: String,
    #[serde(rename = "type", default = "default_tier")]
    pub tier: Tier,
    #[serde(default)]
    pub selector: Option<String>,
}

fn default_tier() -> Tier {
    Tier::Quick
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
        let file: BatchFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse batch file: {}", path.display()))?;
        Ok(file)
    }
}

/// Outcome of one page in the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub url: String,
    #[serde(rename = "type")]
    pub tier: Tier,
    pub overall_score: u8,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub report: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals over every page of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub generated_at: DateTime<Utc>,
    pub total_pages: usize,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub failed_pages: usize,
    pub results: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn from_entries(results: Vec<BatchEntry>) -> Self {
        Self {
            generated_at: Utc::now(),
            total_pages: results.len(),
            total_issues: results.iter().map(|e| e.total_issues).sum(),
            critical_issues: results.iter().map(|e| e.critical_issues).sum(),
            failed_pages: results.iter().filter(|e| e.error.is_some()).count(),
            results,
        }
    }

    /// Writes the summary as `batch-summary-<utc millis>.json`.
    pub async fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize batch summary")?;
        let stem = format!("batch-summary-{}", self.generated_at.format("%Y%m%d-%H%M%S%3f"));
        let path = report::write_unique(output_dir, &stem, "json", json.as_bytes()).await?;
        Ok(path)
    }
}

/// Analyzes every page of `batch` and writes one report per page.
pub async fn run(
    orchestrator: &Orchestrator,
    config: &Config,
    batch: &BatchFile,
    format: ReportFormat,
    output_dir: &Path,
) -> Result<BatchSummary> {
    let mut entries = Vec::with_capacity(batch.pages.len());

    for (i, page) in batch.pages.iter().enumerate() {
        let url = config.resolve_url(&page.url);
        info!("[{}/{}] {} analysis of {}", i + 1, batch.pages.len(), page.tier, url);

        let options = AnalyzeOptions {
            selector: page.selector.clone(),
            ..AnalyzeOptions::default()
        };
        let result = orchestrator.analyze_page(&url, page.tier, &options).await?;
        if let Some(ref error) = result.error {
            warn!("{} could not be analyzed: {}", url, error);
        }

        let report = orchestrator
            .generate_report(&result, format, output_dir)
            .await
            .with_context(|| format!("Failed to write report for {}", url))?;

        let summary = report::summary_of(&result);
        entries.push(BatchEntry {
            url,
            tier: page.tier,
            overall_score: summary.overall_score,
            total_issues: summary.total_issues,
            critical_issues: summary.critical_issues,
            report,
            error: result.error,
        });
    }

    Ok(BatchSummary::from_entries(entries))
}
