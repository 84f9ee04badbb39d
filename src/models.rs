//! Data models for the page auditor.
//!
//! This module contains the core data structures used throughout the
//! application: findings (issues and recommendations), analyzer fragments,
//! metric and score sets, and the canonical analysis result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Severity level of an issue.
///
/// Unknown textual values deserialize to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Severity {
    /// Cosmetic problems and minor suggestions
    Low,
    /// Noticeable UX degradation
    Medium,
    /// Blocks some users or severely degrades the page
    High,
    /// Blocks users outright or breaks the page
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::from(s.as_str())
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }

    /// Lowercase label, as used in serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Expected impact of fixing an issue or applying a recommendation.
///
/// `Quick` marks an easy, immediately visible improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Impact {
    Low,
    Medium,
    High,
    Quick,
}

impl From<&str> for Impact {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Impact::High,
            "low" => Impact::Low,
            "quick" => Impact::Quick,
            _ => Impact::Medium,
        }
    }
}

impl From<String> for Impact {
    fn from(s: String) -> Self {
        Impact::from(s.as_str())
    }
}

impl Default for Impact {
    fn default() -> Self {
        Impact::Medium
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::Low => write!(f, "low"),
            Impact::Medium => write!(f, "medium"),
            Impact::High => write!(f, "high"),
            Impact::Quick => write!(f, "quick"),
        }
    }
}

/// Implementation effort of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl From<&str> for Effort {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Effort::Low,
            "high" => Effort::High,
            _ => Effort::Medium,
        }
    }
}

impl From<String> for Effort {
    fn from(s: String) -> Self {
        Effort::from(s.as_str())
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effort::Low => write!(f, "low"),
            Effort::Medium => write!(f, "medium"),
            Effort::High => write!(f, "high"),
        }
    }
}

/// A defect found on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Free-form category tag (accessibility, performance, visual, mobile, bug, system).
    pub category: String,
    /// Short title describing the issue.
    pub title: String,
    /// Detailed description of the issue.
    #[serde(default)]
    pub description: String,
    /// Name of the analyzer that reported the issue.
    #[serde(default)]
    pub source: String,
    pub severity: Severity,
    /// `medium` unless the analyzer marks the fix as high-impact or quick.
    #[serde(default)]
    pub impact: Impact,
    /// How to fix it.
    #[serde(default)]
    pub remedy: String,
    /// Reference into an external standard, e.g. a WCAG success criterion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_ref: Option<String>,
    /// Number of offending elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_count: Option<usize>,
    /// Raw evidence (element snippets, URLs).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detail: Vec<String>,
}

impl Issue {
    /// Creates an issue with `medium` impact.
    pub fn new(category: &str, title: impl Into<String>, severity: Severity) -> Self {
        Self {
            category: category.to_string(),
            title: title.into(),
            description: String::new(),
            source: String::new(),
            severity,
            impact: Impact::default(),
            remedy: String::new(),
            standard_ref: None,
            occurrence_count: None,
            detail: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedy = remedy.into();
        self
    }

    pub fn impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    pub fn standard(mut self, reference: &str) -> Self {
        self.standard_ref = Some(reference.to_string());
        self
    }

    /// Records the offending elements; also sets the occurrence count.
    pub fn evidence(mut self, detail: Vec<String>) -> Self {
        self.occurrence_count = Some(detail.len());
        self.detail = detail;
        self
    }

    pub fn occurrences(mut self, count: usize) -> Self {
        self.occurrence_count = Some(count);
        self
    }
}

/// A suggested improvement that is not a defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    pub impact: Impact,
    pub effort: Effort,
    #[serde(default)]
    pub suggestion: String,
}

impl Recommendation {
    pub fn new(category: &str, title: impl Into<String>, impact: Impact, effort: Effort) -> Self {
        Self {
            category: category.to_string(),
            title: title.into(),
            description: String::new(),
            source: String::new(),
            impact,
            effort,
            suggestion: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }
}

/// Any single finding an analyzer can report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Finding {
    Issue(Issue),
    Recommendation(Recommendation),
}

impl From<Issue> for Finding {
    fn from(issue: Issue) -> Self {
        Finding::Issue(issue)
    }
}

impl From<Recommendation> for Finding {
    fn from(recommendation: Recommendation) -> Self {
        Finding::Recommendation(recommendation)
    }
}

/// A measured value: numeric, boolean or categorical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            MetricValue::Number(n) => write!(f, "{:.2}", n),
            MetricValue::Flag(b) => write!(f, "{}", b),
            MetricValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Flag(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// Metric name to measured value.
pub type MetricSet = BTreeMap<String, MetricValue>;

/// Score name to a 0-100 score.
pub type ScoreSet = BTreeMap<String, u8>;

/// Clamps a raw score into 0..=100.
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// One analyzer's contribution before merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
    pub metrics: MetricSet,
    pub scores: ScoreSet,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue or a recommendation.
    pub fn push(&mut self, finding: impl Into<Finding>) {
        match finding.into() {
            Finding::Issue(issue) => self.issues.push(issue),
            Finding::Recommendation(rec) => self.recommendations.push(rec),
        }
    }

    pub fn metric(&mut self, name: &str, value: impl Into<MetricValue>) {
        self.metrics.insert(name.to_string(), value.into());
    }

    pub fn score(&mut self, name: &str, raw: i64) {
        self.scores.insert(name.to_string(), clamp_score(raw));
    }

    #[allow(dead_code)] // Used by analyzer tests
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
            && self.recommendations.is_empty()
            && self.metrics.is_empty()
            && self.scores.is_empty()
    }
}

/// Analysis depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Quick,
    Deep,
    Element,
    Full,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Quick => write!(f, "quick"),
            Tier::Deep => write!(f, "deep"),
            Tier::Element => write!(f, "element"),
            Tier::Full => write!(f, "full"),
        }
    }
}

/// One entry of the priority action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityAction {
    pub title: String,
    pub description: String,
    pub action: String,
    pub impact: Impact,
}

/// Derived summary of a finalized analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_issues: usize,
    pub critical_issues: usize,
    pub high_issues: usize,
    pub medium_issues: usize,
    pub low_issues: usize,
    pub total_recommendations: usize,
    /// 0-100; only critical, high and medium issues lower it.
    pub overall_score: u8,
    /// Minutes.
    pub estimated_fix_time: u64,
    pub quick_wins: usize,
    pub priority_actions: Vec<PriorityAction>,
}

/// The canonical aggregate for one page/tier run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub url: String,
    pub tier: Tier,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// In merge order.
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
    pub metrics: MetricSet,
    pub scores: ScoreSet,
    pub screenshots: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    /// Set only when the page itself could not be loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Creates an empty result at tier start.
    pub fn new(url: &str, tier: Tier) -> Self {
        Self {
            url: url.to_string(),
            tier,
            started_at: Utc::now(),
            elapsed_ms: 0,
            issues: Vec::new(),
            recommendations: Vec::new(),
            metrics: MetricSet::new(),
            scores: ScoreSet::new(),
            screenshots: Vec::new(),
            summary: None,
            error: None,
        }
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }
}
