//! Page analyzers.
//!
//! Each analyzer is a stateless set of heuristics run against a loaded
//! page. An analyzer declares which passes it takes part in; the runner
//! picks the analyzers for a pass in registration order.

pub mod accessibility;
pub mod bug_detector;
pub mod dom;
pub mod mobile;
pub mod performance;
pub mod visual;

use crate::browser::Page;
use crate::config::Config;
use crate::error::AnalyzerError;
use crate::models::{Fragment, Severity};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use accessibility::AccessibilityAnalyzer;
pub use bug_detector::BugDetector;
pub use mobile::MobileAnalyzer;
pub use performance::PerformanceAnalyzer;
pub use visual::VisualAnalyzer;

/// The tier intent an analyzer is invoked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pass {
    /// Fast checks run by every tier.
    Quick,
    /// Full audits added by the deep tier.
    Extended,
    /// Checks scoped to the elements matching a selector.
    Element { selector: String },
    /// Audit of a page loaded in a mobile-emulated context.
    Mobile,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Quick => write!(f, "quick"),
            Pass::Extended => write!(f, "extended"),
            Pass::Element { selector } => write!(f, "element({})", selector),
            Pass::Mobile => write!(f, "mobile"),
        }
    }
}

/// Trait implemented by all analyzers.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable name, used as the source of every finding it reports.
    fn name(&self) -> &str;

    /// Whether this analyzer takes part in `pass`.
    fn supports(&self, pass: &Pass) -> bool;

    /// Runs the checks for `pass`. Finding nothing is an empty fragment.
    async fn analyze(&self, page: &dyn Page, pass: &Pass) -> Result<Fragment, AnalyzerError>;
}

/// Builds the analyzer list enabled by `config`, in registration order.
pub fn registry(config: &Config) -> Vec<Arc<dyn Analyzer>> {
    let toggles = &config.analysis;
    let thresholds = &config.thresholds;
    let mut analyzers: Vec<Arc<dyn Analyzer>> = Vec::new();

    if toggles.bugs {
        analyzers.push(Arc::new(BugDetector));
    }
    if toggles.accessibility {
        analyzers.push(Arc::new(AccessibilityAnalyzer));
    }
    if toggles.performance {
        analyzers.push(Arc::new(PerformanceAnalyzer::new(thresholds.clone())));
    }
    if toggles.visual {
        analyzers.push(Arc::new(VisualAnalyzer::new(thresholds.clone())));
    }
    if toggles.mobile {
        analyzers.push(Arc::new(MobileAnalyzer::new(thresholds.clone())));
    }

    analyzers
}

/// Per-analyzer score: every issue in the fragment costs points by severity.
pub(crate) fn fragment_score(fragment: &Fragment) -> i64 {
    let penalty: i64 = fragment
        .issues
        .iter()
        .map(|issue| match issue.severity {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 8,
            Severity::Low => 3,
        })
        .sum();
    100 - penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Issue;

    #[test]
    fn test_registry_order_and_toggles() {
        let config = Config::default();
        let names: Vec<String> = registry(&config)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["bug-detector", "accessibility", "performance", "visual", "mobile"]
        );

        let mut config = Config::default();
        config.analysis.visual = false;
        config.analysis.bugs = false;
        let names: Vec<String> = registry(&config)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["accessibility", "performance", "mobile"]);
    }

    #[test]
    fn test_pass_coverage() {
        let config = Config::default();
        let analyzers = registry(&config);
        let names_for = |pass: Pass| -> Vec<String> {
            analyzers
                .iter()
                .filter(|a| a.supports(&pass))
                .map(|a| a.name().to_string())
                .collect()
        };

        assert_eq!(
            names_for(Pass::Quick),
            vec!["bug-detector", "accessibility", "performance"]
        );
        assert_eq!(
            names_for(Pass::Extended),
            vec!["accessibility", "performance", "visual", "mobile"]
        );
        assert_eq!(
            names_for(Pass::Element {
                selector: "main".to_string()
            }),
            vec!["accessibility", "visual"]
        );
        assert_eq!(names_for(Pass::Mobile), vec!["mobile"]);
    }

    #[test]
    fn test_fragment_score() {
        let mut fragment = Fragment::new();
        assert_eq!(fragment_score(&fragment), 100);

        fragment.push(Issue::new("a", "x", Severity::Critical));
        fragment.push(Issue::new("a", "y", Severity::Low));
        assert_eq!(fragment_score(&fragment), 72);
    }
}
