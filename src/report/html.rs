//! HTML dashboard report.
//!
//! A single self-contained page: inline styles, no scripts, no external
//! assets.

use super::{summary_of, ReportFormat, Reporter};
use crate::analysis::{category_breakdown, group_by_category, sort_issues_by_severity};
use crate::error::ReportError;
use crate::models::{AnalysisResult, Issue, Severity, Summary};

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; margin: 0; background: #f5f6f8; color: #1f2933; }
header { background: #1f2933; color: #fff; padding: 24px 32px; }
header h1 { margin: 0 0 8px; font-size: 24px; }
header p { margin: 0; opacity: .8; }
main { max-width: 1100px; margin: 0 auto; padding: 24px 32px; }
section { background: #fff; border-radius: 8px; padding: 20px 24px; margin-bottom: 20px; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
h2 { margin-top: 0; font-size: 18px; }
.cards { display: flex; flex-wrap: wrap; gap: 12px; }
.card { flex: 1 1 140px; border-radius: 6px; padding: 12px 16px; background: #f0f2f5; }
.card .value { font-size: 28px; font-weight: 600; }
.score { font-size: 48px; font-weight: 700; }
.good { color: #1a7f37; } .fair { color: #b7791f; } .poor { color: #c53030; }
.sev { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 12px; font-weight: 600; color: #fff; }
.sev-critical { background: #c53030; } .sev-high { background: #dd6b20; } .sev-medium { background: #d69e2e; } .sev-low { background: #38a169; }
.issue { border-left: 4px solid #cbd2d9; padding: 8px 12px; margin: 12px 0; }
.issue h3 { margin: 0 0 4px; font-size: 15px; }
.meta { color: #616e7c; font-size: 13px; }
pre { background: #f0f2f5; padding: 8px; overflow-x: auto; font-size: 12px; }
table { border-collapse: collapse; width: 100%; font-size: 14px; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #e4e7eb; }
.error { background: #fff5f5; border: 1px solid #feb2b2; color: #9b2c2c; }
"#;

/// HTML reporter.
pub struct HtmlReporter {
    max_listed: usize,
}

impl HtmlReporter {
    pub fn new(max_listed: usize) -> Self {
        Self {
            max_listed: max_listed.max(1),
        }
    }
}

impl Reporter for HtmlReporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn render(&self, result: &AnalysisResult) -> Result<String, ReportError> {
        Ok(generate_html_report(result, self.max_listed))
    }
}

/// Escapes text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn score_class(score: u8) -> &'static str {
    match score {
        80..=100 => "good",
        50..=79 => "fair",
        _ => "poor",
    }
}

/// Generate the complete HTML document.
pub fn generate_html_report(result: &AnalysisResult, max_listed: usize) -> String {
    let summary = summary_of(result);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>UX Audit: {}</title>\n<style>{}</style>\n</head>\n<body>\n",
        escape(&result.url),
        STYLE
    ));

    html.push_str(&format!(
        "<header><h1>UX Audit Report</h1><p>{} &middot; {} analysis &middot; {} &middot; {:.1}s</p></header>\n<main>\n",
        escape(&result.url),
        result.tier,
        result.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        result.elapsed_ms as f64 / 1000.0
    ));

    if let Some(ref error) = result.error {
        html.push_str(&format!(
            "<section class=\"error\"><h2>Page could not be analyzed</h2><p>{}</p></section>\n",
            escape(error)
        ));
    }

    html.push_str(&overview_section(&summary));
    html.push_str(&priority_section(&summary));
    html.push_str(&categories_section(result));
    html.push_str(&issues_section(&result.issues, max_listed));
    html.push_str(&recommendations_section(result));
    html.push_str(&measurements_section(result));

    html.push_str(&format!(
        "</main>\n<footer class=\"meta\" style=\"text-align:center;padding:16px\">Generated by uxaudit {}</footer>\n</body>\n</html>\n",
        env!("CARGO_PKG_VERSION")
    ));

    html
}

fn overview_section(summary: &Summary) -> String {
    let mut section = String::from("<section><h2>Overview</h2>\n<div class=\"cards\">\n");

    section.push_str(&format!(
        "<div class=\"card\"><div class=\"meta\">Overall score</div><div class=\"score {}\">{}</div></div>\n",
        score_class(summary.overall_score),
        summary.overall_score
    ));

    for (severity, count) in [
        (Severity::Critical, summary.critical_issues),
        (Severity::High, summary.high_issues),
        (Severity::Medium, summary.medium_issues),
        (Severity::Low, summary.low_issues),
    ] {
        section.push_str(&format!(
            "<div class=\"card\"><div class=\"meta\"><span class=\"sev sev-{}\">{}</span></div><div class=\"value\">{}</div></div>\n",
            severity.as_str(),
            severity,
            count
        ));
    }

    section.push_str(&format!(
        "<div class=\"card\"><div class=\"meta\">Estimated fix time</div><div class=\"value\">{} min</div></div>\n",
        summary.estimated_fix_time
    ));
    section.push_str(&format!(
        "<div class=\"card\"><div class=\"meta\">Quick wins</div><div class=\"value\">{}</div></div>\n",
        summary.quick_wins
    ));
    section.push_str("</div></section>\n");

    section
}

fn priority_section(summary: &Summary) -> String {
    if summary.priority_actions.is_empty() {
        return String::new();
    }

    let mut section = String::from("<section><h2>Priority Actions</h2>\n<ol>\n");
    for action in &summary.priority_actions {
        section.push_str(&format!(
            "<li><strong>{}</strong><br><span class=\"meta\">{}</span>",
            escape(&action.title),
            escape(&action.description)
        ));
        if !action.action.is_empty() {
            section.push_str(&format!("<br>Fix: {}", escape(&action.action)));
        }
        section.push_str("</li>\n");
    }
    section.push_str("</ol></section>\n");

    section
}

fn categories_section(result: &AnalysisResult) -> String {
    let breakdown = category_breakdown(result);
    if breakdown.is_empty() {
        return String::new();
    }

    let mut section = String::from(
        "<section><h2>Categories</h2>\n<table><tr><th>Category</th><th>Issues</th><th>Critical</th><th>Recommendations</th><th>Score</th></tr>\n",
    );
    for (category, entry) in &breakdown {
        let score = entry
            .score
            .map(|s| format!("<span class=\"{}\">{}</span>", score_class(s), s))
            .unwrap_or_else(|| "&ndash;".to_string());
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(category),
            entry.issues,
            entry.critical,
            entry.recommendations,
            score
        ));
    }
    section.push_str("</table></section>\n");

    section
}

fn issues_section(issues: &[Issue], max_listed: usize) -> String {
    let mut section = String::from("<section><h2>Issues</h2>\n");

    if issues.is_empty() {
        section.push_str("<p>No issues were found on this page.</p></section>\n");
        return section;
    }

    for (category, group) in group_by_category(issues) {
        let mut sorted: Vec<Issue> = group.into_iter().cloned().collect();
        sort_issues_by_severity(&mut sorted);

        section.push_str(&format!("<h3>{} ({})</h3>\n", escape(&category), sorted.len()));
        for issue in sorted.iter().take(max_listed) {
            section.push_str(&issue_block(issue));
        }
        if sorted.len() > max_listed {
            section.push_str(&format!(
                "<p class=\"meta\">&hellip;and {} more.</p>\n",
                sorted.len() - max_listed
            ));
        }
    }
    section.push_str("</section>\n");

    section
}

fn issue_block(issue: &Issue) -> String {
    let mut block = format!(
        "<div class=\"issue\"><h3><span class=\"sev sev-{}\">{}</span> {}</h3>\n",
        issue.severity.as_str(),
        issue.severity,
        escape(&issue.title)
    );

    let mut facts = vec![format!("impact {}", issue.impact)];
    if let Some(ref standard) = issue.standard_ref {
        facts.push(escape(standard));
    }
    if let Some(count) = issue.occurrence_count {
        facts.push(format!("{} occurrence(s)", count));
    }
    if !issue.source.is_empty() {
        facts.push(format!("from {}", escape(&issue.source)));
    }
    block.push_str(&format!("<div class=\"meta\">{}</div>\n", facts.join(" &middot; ")));

    if !issue.description.is_empty() {
        block.push_str(&format!("<p>{}</p>\n", escape(&issue.description)));
    }
    if !issue.detail.is_empty() {
        block.push_str(&format!("<pre>{}</pre>\n", escape(&issue.detail.join("\n"))));
    }
    if !issue.remedy.is_empty() {
        block.push_str(&format!("<p><strong>Fix:</strong> {}</p>\n", escape(&issue.remedy)));
    }
    block.push_str("</div>\n");

    block
}

fn recommendations_section(result: &AnalysisResult) -> String {
    if result.recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::from(
        "<section><h2>Recommendations</h2>\n<table><tr><th>Category</th><th>Recommendation</th><th>Impact</th><th>Effort</th></tr>\n",
    );
    for rec in &result.recommendations {
        let mut text = format!("<strong>{}</strong>", escape(&rec.title));
        if !rec.suggestion.is_empty() {
            text.push_str(&format!("<br><span class=\"meta\">{}</span>", escape(&rec.suggestion)));
        }
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&rec.category),
            text,
            rec.impact,
            rec.effort
        ));
    }
    section.push_str("</table></section>\n");

    section
}

fn measurements_section(result: &AnalysisResult) -> String {
    if result.metrics.is_empty() && result.scores.is_empty() && result.screenshots.is_empty() {
        return String::new();
    }

    let mut section = String::from("<section><h2>Measurements</h2>\n<table>\n");
    for (name, score) in &result.scores {
        section.push_str(&format!(
            "<tr><td>{}</td><td class=\"{}\">{}</td></tr>\n",
            escape(name),
            score_class(*score),
            score
        ));
    }
    for (name, value) in &result.metrics {
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape(name),
            escape(&value.to_string())
        ));
    }
    section.push_str("</table>\n");

    if !result.screenshots.is_empty() {
        section.push_str("<h3>Screenshots</h3>\n<ul>\n");
        for shot in &result.screenshots {
            let path = escape(&shot.display().to_string());
            section.push_str(&format!("<li><a href=\"{}\">{}</a></li>\n", path, path));
        }
        section.push_str("</ul>\n");
    }
    section.push_str("</section>\n");

    section
}
