//! Summary and scoring.
//!
//! A pure function over a fully merged result. It is recomputed from
//! scratch on every call, so calling it twice yields the same summary.

use crate::models::{AnalysisResult, Effort, Impact, Issue, PriorityAction, Severity, Summary};

/// Score points lost per critical issue.
pub const CRITICAL_PENALTY: i64 = 20;
/// Score points lost per high issue.
pub const HIGH_PENALTY: i64 = 10;
/// Score points lost per medium issue.
pub const MEDIUM_PENALTY: i64 = 5;

/// Maximum number of priority actions.
pub const MAX_PRIORITY_ACTIONS: usize = 3;

/// Estimated minutes to fix one issue of the given severity.
pub fn fix_minutes(severity: Severity) -> u64 {
    match severity {
        Severity::Critical => 120,
        Severity::High => 60,
        Severity::Medium => 30,
        Severity::Low => 15,
    }
}

/// `max(0, 100 - 20×critical - 10×high - 5×medium)`; low issues are free.
pub fn overall_score(critical: usize, high: usize, medium: usize) -> u8 {
    let penalty = CRITICAL_PENALTY * critical as i64
        + HIGH_PENALTY * high as i64
        + MEDIUM_PENALTY * medium as i64;
    (100 - penalty).max(0) as u8
}

fn is_priority(issue: &Issue) -> bool {
    issue.severity == Severity::Critical || issue.impact == Impact::High
}

/// Derives the summary block of `result`.
pub fn summarize(result: &AnalysisResult) -> Summary {
    let mut summary = Summary {
        total_issues: result.issues.len(),
        total_recommendations: result.recommendations.len(),
        ..Summary::default()
    };

    for issue in &result.issues {
        match issue.severity {
            Severity::Critical => summary.critical_issues += 1,
            Severity::High => summary.high_issues += 1,
            Severity::Medium => summary.medium_issues += 1,
            Severity::Low => summary.low_issues += 1,
        }
        summary.estimated_fix_time += fix_minutes(issue.severity);
    }

    summary.overall_score = overall_score(
        summary.critical_issues,
        summary.high_issues,
        summary.medium_issues,
    );

    summary.quick_wins = result
        .recommendations
        .iter()
        .filter(|r| r.effort == Effort::Low || r.impact == Impact::Quick)
        .count();

    summary.priority_actions = result
        .issues
        .iter()
        .filter(|i| is_priority(i))
        .take(MAX_PRIORITY_ACTIONS)
        .map(|i| PriorityAction {
            title: i.title.clone(),
            description: i.description.clone(),
            action: i.remedy.clone(),
            impact: i.impact,
        })
        .collect();

    summary
}
