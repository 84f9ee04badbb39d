//! Markdown report generation.
//!
//! This module generates Markdown audit reports from a finalized
//! analysis result.

use super::{summary_of, ReportFormat, Reporter};
use crate::analysis::{group_by_category, group_recommendations, sort_issues_by_severity};
use crate::error::ReportError;
use crate::models::{AnalysisResult, Issue, Recommendation, Severity, Summary};

/// Markdown reporter.
pub struct MarkdownReporter {
    max_listed: usize,
}

impl MarkdownReporter {
    pub fn new(max_listed: usize) -> Self {
        Self {
            max_listed: max_listed.max(1),
        }
    }
}

impl Reporter for MarkdownReporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Markdown
    }

    fn render(&self, result: &AnalysisResult) -> Result<String, ReportError> {
        Ok(generate_markdown_report(result, self.max_listed))
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(result: &AnalysisResult, max_listed: usize) -> String {
    let summary = summary_of(result);
    let mut output = String::new();

    output.push_str("# UX Audit Report\n\n");
    output.push_str(&generate_metadata_section(result));
    output.push_str(&generate_summary_section(&summary));
    output.push_str(&generate_priority_section(&summary));
    output.push_str(&generate_issues_section(&result.issues, max_listed));
    output.push_str(&generate_recommendations_section(&result.recommendations));
    output.push_str(&generate_measurements_section(result));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(result: &AnalysisResult) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **URL:** {}\n", result.url));
    section.push_str(&format!("- **Analysis Type:** {}\n", result.tier));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        result.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        result.elapsed_ms as f64 / 1000.0
    ));
    if !result.screenshots.is_empty() {
        section.push_str("- **Screenshots:**\n");
        for shot in &result.screenshots {
            section.push_str(&format!("  - `{}`\n", shot.display()));
        }
    }
    if let Some(ref error) = result.error {
        section.push_str(&format!("\n> ⚠️ **The page could not be analyzed:** {}\n", error));
    }
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &Summary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!("**Overall Score:** {}/100\n\n", summary.overall_score));

    section.push_str("### Issue Severity Breakdown\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        summary.critical_issues,
        summary.high_issues,
        summary.medium_issues,
        summary.low_issues,
        summary.total_issues
    ));

    section.push_str(&format!(
        "- **Estimated Fix Time:** {}\n",
        format_minutes(summary.estimated_fix_time)
    ));
    section.push_str(&format!(
        "- **Recommendations:** {} ({} quick wins)\n\n",
        summary.total_recommendations, summary.quick_wins
    ));

    section
}

fn format_minutes(minutes: u64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Generate the priority actions section.
fn generate_priority_section(summary: &Summary) -> String {
    if summary.priority_actions.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Priority Actions\n\n");

    for (i, action) in summary.priority_actions.iter().enumerate() {
        section.push_str(&format!("{}. **{}**", i + 1, action.title));
        if !action.action.is_empty() {
            section.push_str(&format!(": {}", action.action));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate the issues section, grouped by category.
fn generate_issues_section(issues: &[Issue], max_listed: usize) -> String {
    let mut section = String::new();

    section.push_str("## Issues by Category\n\n");

    if issues.is_empty() {
        section.push_str("No issues were found on this page. Great job! 🎉\n\n");
        return section;
    }

    for (category, group) in group_by_category(issues) {
        let mut sorted: Vec<Issue> = group.into_iter().cloned().collect();
        sort_issues_by_severity(&mut sorted);

        section.push_str(&format!("### {} ({})\n\n", category, sorted.len()));
        for issue in sorted.iter().take(max_listed) {
            section.push_str(&generate_issue_block(issue));
        }
        if sorted.len() > max_listed {
            section.push_str(&format!(
                "*…and {} more {} issue(s).*\n\n",
                sorted.len() - max_listed,
                category
            ));
        }
    }

    section
}

/// Generate a single issue block.
fn generate_issue_block(issue: &Issue) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "#### {} **{}** {}\n\n",
        issue.severity.emoji(),
        issue.severity.as_str().to_uppercase(),
        issue.title
    ));

    let mut facts = vec![format!("Impact: {}", issue.impact)];
    if let Some(ref standard) = issue.standard_ref {
        facts.push(standard.clone());
    }
    if let Some(count) = issue.occurrence_count {
        facts.push(format!("Occurrences: {}", count));
    }
    if !issue.source.is_empty() {
        facts.push(format!("Source: {}", issue.source));
    }
    block.push_str(&format!("*{}*\n\n", facts.join(" | ")));

    if !issue.description.is_empty() {
        block.push_str(&format!("**Description:** {}\n\n", issue.description));
    }

    if !issue.detail.is_empty() {
        block.push_str("<details>\n<summary>Evidence</summary>\n\n```html\n");
        block.push_str(&issue.detail.join("\n"));
        block.push_str("\n```\n</details>\n\n");
    }

    if !issue.remedy.is_empty() {
        block.push_str(&format!("> 💡 **Fix:** {}\n\n", issue.remedy));
    }

    block.push_str("---\n\n");

    block
}

/// Generate the recommendations section.
fn generate_recommendations_section(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Recommendations\n\n");
    section.push_str("| Category | Recommendation | Impact | Effort |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");

    for (category, group) in group_recommendations(recommendations) {
        for rec in group {
            let text = if rec.suggestion.is_empty() {
                rec.title.clone()
            } else {
                format!("{}: {}", rec.title, rec.suggestion)
            };
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                category,
                text.replace('|', "\\|"),
                rec.impact,
                rec.effort
            ));
        }
    }
    section.push('\n');

    section
}

/// Generate the metrics and scores tables.
fn generate_measurements_section(result: &AnalysisResult) -> String {
    if result.metrics.is_empty() && result.scores.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Measurements\n\n");

    if !result.scores.is_empty() {
        section.push_str("| Score | Value |\n|:---|:---:|\n");
        for (name, score) in &result.scores {
            section.push_str(&format!("| {} | {} |\n", name, score));
        }
        section.push('\n');
    }

    if !result.metrics.is_empty() {
        section.push_str("| Metric | Value |\n|:---|:---:|\n");
        for (name, value) in &result.metrics {
            section.push_str(&format!("| {} | {} |\n", name, value));
        }
        section.push('\n');
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by uxaudit {}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Effort, Impact, MetricValue, Tier};

    fn create_test_result() -> AnalysisResult {
        let mut result = AnalysisResult::new("https://example.com/checkout", Tier::Deep);
        result.issues = vec![
            Issue::new("accessibility", "Form controls without labels", Severity::Critical)
                .description("Screen readers cannot announce these fields.")
                .remedy("Associate a <label> with every control.")
                .standard("WCAG 1.3.1")
                .evidence(vec!["<input name=\"email\">".to_string()]),
            Issue::new("performance", "Slow page load", Severity::High),
            Issue::new("accessibility", "Missing page title", Severity::Medium),
        ];
        result.recommendations = vec![Recommendation::new(
            "mobile",
            "Serve responsive images",
            Impact::Medium,
            Effort::Low,
        )
        .suggestion("Use srcset")];
        result
            .metrics
            .insert("domSize".to_string(), MetricValue::Number(812.0));
        result.scores.insert("performanceScore".to_string(), 72);
        result
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_result(), 50);

        assert!(markdown.contains("# UX Audit Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("https://example.com/checkout"));
        assert!(markdown.contains("**Overall Score:** 65/100"));
        assert!(markdown.contains("## Priority Actions"));
        assert!(markdown.contains("### accessibility (2)"));
        assert!(markdown.contains("WCAG 1.3.1"));
        assert!(markdown.contains("Serve responsive images: Use srcset"));
        assert!(markdown.contains("| domSize | 812 |"));
        assert!(markdown.contains("| performanceScore | 72 |"));
    }

    #[test]
    fn test_issues_sorted_and_truncated() {
        let markdown = generate_markdown_report(&create_test_result(), 1);

        let issues = markdown.find("## Issues by Category").unwrap();
        let section = &markdown[issues..];
        let critical = section
            .find("#### 🔴 **CRITICAL** Form controls without labels")
            .unwrap();
        assert!(!section.contains("#### 🟡 **MEDIUM** Missing page title"));
        assert!(section.contains("…and 1 more accessibility issue(s)."));
        assert!(critical < section.find("…and 1 more").unwrap());
    }

    #[test]
    fn test_empty_and_failed_result() {
        let mut result = AnalysisResult::new("https://down.example.com", Tier::Quick);
        result.error = Some("navigation to https://down.example.com failed: HTTP 503".to_string());

        let markdown = generate_markdown_report(&result, 50);
        assert!(markdown.contains("No issues were found"));
        assert!(markdown.contains("The page could not be analyzed"));
        assert!(!markdown.contains("## Priority Actions"));
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(255), "4h 15m");
    }
}
