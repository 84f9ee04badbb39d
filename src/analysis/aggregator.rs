//! Result aggregation and statistics.
//!
//! The aggregator owns the result of one tier run and merges analyzer
//! fragments into it. The free functions compute the per-category and
//! compliance breakdowns the reporters render.

use super::runner::BatchOutcome;
use super::scoring::summarize;
use crate::models::{AnalysisResult, Fragment, Issue, Recommendation, Severity, Tier};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

/// Category of synthetic issues raised for failed analyzers.
pub const SYSTEM_CATEGORY: &str = "system";

/// Accumulates fragments into a single [`AnalysisResult`].
pub struct Aggregator {
    result: AnalysisResult,
    started: Instant,
}

impl Aggregator {
    pub fn new(url: &str, tier: Tier) -> Self {
        Self {
            result: AnalysisResult::new(url, tier),
            started: Instant::now(),
        }
    }

    /// Merges one analyzer's fragment: findings are appended and stamped
    /// with `source`, metrics and scores overwrite earlier values.
    pub fn merge(&mut self, source: &str, fragment: Fragment) {
        debug!(
            "Merging {} issue(s), {} recommendation(s) from {}",
            fragment.issues.len(),
            fragment.recommendations.len(),
            source
        );

        self.result
            .issues
            .extend(fragment.issues.into_iter().map(|mut issue| {
                issue.source = source.to_string();
                issue
            }));
        self.result
            .recommendations
            .extend(fragment.recommendations.into_iter().map(|mut rec| {
                rec.source = source.to_string();
                rec
            }));
        self.result.metrics.extend(fragment.metrics);
        self.result.scores.extend(fragment.scores);
    }

    /// Records a failed analyzer as a synthetic system issue.
    pub fn record_failure(&mut self, source: &str, error: impl fmt::Display) {
        warn!("Analyzer {} failed: {}", source, error);
        self.result.issues.push(system_issue(source, &error.to_string()));
    }

    /// Merges a settled batch in registration order.
    pub fn absorb(&mut self, outcomes: Vec<BatchOutcome>) {
        for outcome in outcomes {
            match outcome.result {
                Ok(fragment) => self.merge(&outcome.analyzer, fragment),
                Err(e) => self.record_failure(&outcome.analyzer, e),
            }
        }
    }

    /// Marks the page itself as unreachable.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.result.error = Some(message.into());
    }

    pub fn add_screenshot(&mut self, path: PathBuf) {
        self.result.screenshots.push(path);
    }

    #[allow(dead_code)] // Inspect a run in progress
    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    /// Stamps the elapsed time and derives the summary.
    pub fn finish(mut self) -> AnalysisResult {
        self.result.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.result.summary = Some(summarize(&self.result));
        self.result
    }
}

/// Builds the issue that stands in for an analyzer's missing fragment.
pub fn system_issue(analyzer: &str, message: &str) -> Issue {
    let mut issue = Issue::new(
        SYSTEM_CATEGORY,
        format!("Analyzer {} failed", analyzer),
        Severity::Medium,
    )
    .description(message)
    .remedy("Check the log output; results from this analyzer are missing.");
    issue.source = analyzer.to_string();
    issue
}

/// Sort issues by severity (critical first), keeping merge order within a level.
pub fn sort_issues_by_severity(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
}

/// Group issues by category.
pub fn group_by_category(issues: &[Issue]) -> BTreeMap<String, Vec<&Issue>> {
    let mut grouped: BTreeMap<String, Vec<&Issue>> = BTreeMap::new();

    for issue in issues {
        grouped.entry(issue.category.clone()).or_default().push(issue);
    }

    grouped
}

/// Group recommendations by category.
pub fn group_recommendations(recs: &[Recommendation]) -> BTreeMap<String, Vec<&Recommendation>> {
    let mut grouped: BTreeMap<String, Vec<&Recommendation>> = BTreeMap::new();

    for rec in recs {
        grouped.entry(rec.category.clone()).or_default().push(rec);
    }

    grouped
}

/// Per-category counts for reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub issues: usize,
    pub critical: usize,
    pub recommendations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

/// Counts issues and recommendations per category. A category picks up
/// the `<category>Score` entry when the analyzers produced one.
pub fn category_breakdown(result: &AnalysisResult) -> BTreeMap<String, CategoryBreakdown> {
    let mut categories: BTreeMap<String, CategoryBreakdown> = BTreeMap::new();

    for issue in &result.issues {
        let entry = categories.entry(issue.category.clone()).or_default();
        entry.issues += 1;
        if issue.severity == Severity::Critical {
            entry.critical += 1;
        }
    }
    for rec in &result.recommendations {
        categories.entry(rec.category.clone()).or_default().recommendations += 1;
    }

    for (category, entry) in categories.iter_mut() {
        entry.score = result.scores.get(&format!("{}Score", category)).copied();
    }

    categories
}

/// Standards coverage of the reported issues.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub standard: &'static str,
    pub referenced_issues: usize,
    pub criteria: Vec<String>,
    pub passes_critical_checks: bool,
}

/// Summarizes WCAG references. Critical checks pass when no
/// standard-referenced issue is critical.
pub fn compliance(result: &AnalysisResult) -> Compliance {
    let referenced: Vec<&Issue> = result
        .issues
        .iter()
        .filter(|i| i.standard_ref.is_some())
        .collect();

    let criteria: BTreeSet<String> = referenced
        .iter()
        .filter_map(|i| i.standard_ref.clone())
        .collect();

    Compliance {
        standard: "WCAG 2.1",
        referenced_issues: referenced.len(),
        criteria: criteria.into_iter().collect(),
        passes_critical_checks: referenced.iter().all(|i| i.severity != Severity::Critical),
    }
}
