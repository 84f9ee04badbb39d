//! Mobile analyzer.
//!
//! The extended pass checks responsiveness signals in the desktop
//! document (viewport meta, zoom, media queries). The mobile pass runs
//! against a page loaded in a mobile-emulated context and adds touch
//! target and horizontal overflow checks.

use super::dom::{snippets, style_px, style_value, Scope};
use super::{fragment_score, Analyzer, Pass};
use crate::browser::Page;
use crate::config::Thresholds;
use crate::error::AnalyzerError;
use crate::models::{Effort, Fragment, Impact, Issue, Recommendation, Severity};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const CATEGORY: &str = "mobile";
const EVIDENCE_LIMIT: usize = 5;

/// Analyzer for mobile friendliness.
pub struct MobileAnalyzer {
    thresholds: Thresholds,
}

impl MobileAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait]
impl Analyzer for MobileAnalyzer {
    fn name(&self) -> &str {
        "mobile"
    }

    fn supports(&self, pass: &Pass) -> bool {
        matches!(pass, Pass::Extended | Pass::Mobile)
    }

    async fn analyze(&self, page: &dyn Page, pass: &Pass) -> Result<Fragment, AnalyzerError> {
        let viewport_width = page.viewport().await.width;
        let html = page.content().await?;
        inspect(&html, pass, viewport_width, &self.thresholds)
    }
}

fn inspect(
    html: &str,
    pass: &Pass,
    viewport_width: u32,
    thresholds: &Thresholds,
) -> Result<Fragment, AnalyzerError> {
    let doc = Html::parse_document(html);
    let scope = Scope::document(&doc);
    let mut fragment = Fragment::new();

    match pass {
        Pass::Extended => {
            check_viewport_meta(&scope, &mut fragment)?;
            check_media_queries(&scope, &mut fragment)?;
            fragment.score("mobileScore", fragment_score(&fragment));
        }
        Pass::Mobile => {
            fragment.metric("mobileViewportWidth", viewport_width as u64);
            check_viewport_meta(&scope, &mut fragment)?;
            check_touch_targets(&scope, thresholds, &mut fragment)?;
            check_horizontal_overflow(&scope, viewport_width, &mut fragment)?;
            fragment.score("mobileScore", fragment_score(&fragment));
        }
        Pass::Quick | Pass::Element { .. } => {}
    }

    Ok(fragment)
}

fn check_viewport_meta(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let content = scope
        .find("meta[name=viewport]")?
        .first()
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.to_lowercase());

    fragment.metric("hasViewportMeta", content.is_some());

    let Some(content) = content else {
        fragment.push(
            Issue::new(CATEGORY, "Missing viewport meta tag", Severity::High)
                .description("Mobile browsers render the page at desktop width and scale it down.")
                .remedy("Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">."),
        );
        return Ok(());
    };

    let setting = |key: &str| -> Option<String> {
        content.split(&[',', ';'][..]).find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == key).then(|| v.trim().to_string())
        })
    };

    let zoom_disabled = setting("user-scalable").is_some_and(|v| v == "no" || v == "0")
        || setting("maximum-scale")
            .and_then(|v| v.parse::<f32>().ok())
            .is_some_and(|scale| scale < 2.0);

    if zoom_disabled {
        fragment.push(
            Issue::new(CATEGORY, "Pinch-zoom is disabled", Severity::Medium)
                .description("The viewport meta prevents users from zooming in.")
                .remedy("Remove user-scalable=no and maximum-scale from the viewport meta.")
                .standard("WCAG 1.4.4")
                .impact(Impact::Quick),
        );
    }

    if setting("width").is_none() {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Set the viewport width to device-width",
                Impact::Medium,
                Effort::Low,
            )
            .suggestion("Use content=\"width=device-width, initial-scale=1\"."),
        );
    }

    Ok(())
}

fn check_media_queries(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let inline_queries = scope
        .find("style")?
        .iter()
        .any(|s| s.text().any(|t| t.contains("@media")));
    let responsive_links = scope.count("link[rel=stylesheet][media]")? > 0;
    let srcset = scope.count("img[srcset], picture source")?;

    fragment.metric("responsiveImages", srcset);

    if !inline_queries && !responsive_links && scope.count("link[rel=stylesheet]")? == 0 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Add responsive breakpoints",
                Impact::High,
                Effort::Medium,
            )
            .description("No stylesheet or media query targets small screens.")
            .suggestion("Add media queries for widths below 768px."),
        );
    }

    if srcset == 0 && scope.count("img")? > 0 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Serve responsive images",
                Impact::Medium,
                Effort::Medium,
            )
            .suggestion("Use srcset/sizes so phones download smaller images."),
        );
    }

    Ok(())
}

fn check_touch_targets(
    scope: &Scope<'_>,
    thresholds: &Thresholds,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let minimum = thresholds.touch_target_px as f32;
    let controls = scope.find("a[href], button, input, select, textarea, [role=button]")?;
    fragment.metric("touchTargetsChecked", controls.len());

    let small: Vec<ElementRef<'_>> = controls
        .into_iter()
        .filter(|c| {
            let width = style_px(c, "width").or_else(|| style_px(c, "min-width"));
            let height = style_px(c, "height").or_else(|| style_px(c, "min-height"));
            width.is_some_and(|w| w < minimum) || height.is_some_and(|h| h < minimum)
        })
        .collect();

    if !small.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} touch target(s) smaller than {}px", small.len(), minimum),
                Severity::Medium,
            )
            .description("Small controls are hard to tap accurately.")
            .remedy("Make interactive elements at least 44×44 CSS pixels.")
            .standard("WCAG 2.5.5")
            .evidence(snippets(&small, EVIDENCE_LIMIT))
            .occurrences(small.len()),
        );
    }

    Ok(())
}

fn check_horizontal_overflow(
    scope: &Scope<'_>,
    viewport_width: u32,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let limit = viewport_width as f32;
    let overflowing: Vec<ElementRef<'_>> = scope
        .find("[style]")?
        .into_iter()
        .filter(|e| {
            let fixed = style_px(e, "width").or_else(|| style_px(e, "min-width"));
            let wraps = e
                .value()
                .attr("style")
                .and_then(|s| style_value(s, "max-width"))
                .is_some();
            !wraps && fixed.is_some_and(|w| w > limit)
        })
        .collect();

    if !overflowing.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                "Content overflows the mobile viewport",
                Severity::High,
            )
            .description(format!(
                "{} element(s) are wider than {}px and force horizontal scrolling.",
                overflowing.len(),
                viewport_width
            ))
            .remedy("Replace fixed widths with max-width: 100% or flexible units.")
            .standard("WCAG 1.4.10")
            .evidence(snippets(&overflowing, EVIDENCE_LIMIT))
            .occurrences(overflowing.len()),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_viewport() {
        let fragment = inspect(
            "<html><head></head><body></body></html>",
            &Pass::Extended,
            1920,
            &Thresholds::default(),
        )
        .unwrap();

        assert_eq!(fragment.issues.len(), 1);
        assert_eq!(fragment.issues[0].severity, Severity::High);
        assert_eq!(
            fragment.metrics["hasViewportMeta"],
            crate::models::MetricValue::Flag(false)
        );
    }

    #[test]
    fn test_zoom_disabled() {
        let html = r#"<html><head>
            <meta name="viewport" content="width=device-width, initial-scale=1, user-scalable=no">
            <style>@media (max-width: 600px) { body { margin: 0 } }</style>
            </head><body></body></html>"#;

        let fragment = inspect(html, &Pass::Extended, 1920, &Thresholds::default()).unwrap();
        assert_eq!(fragment.issues.len(), 1);
        assert_eq!(fragment.issues[0].title, "Pinch-zoom is disabled");
        assert_eq!(fragment.issues[0].impact, Impact::Quick);
        assert!(fragment.recommendations.is_empty());
    }

    #[test]
    fn test_mobile_pass() {
        let html = r#"<html><head>
            <meta name="viewport" content="width=device-width, initial-scale=1">
            </head><body>
            <a href="/x" style="width: 20px; height: 20px">x</a>
            <button style="min-height: 48px">ok</button>
            <div style="width: 900px">table</div>
            <div style="width: 900px; max-width: 100%">fluid</div>
            </body></html>"#;

        let fragment = inspect(html, &Pass::Mobile, 375, &Thresholds::default()).unwrap();
        let titles: Vec<&str> = fragment.issues.iter().map(|i| i.title.as_str()).collect();

        assert!(titles.contains(&"1 touch target(s) smaller than 44px"));
        assert!(titles.contains(&"Content overflows the mobile viewport"));
        let overflow = fragment
            .issues
            .iter()
            .find(|i| i.title == "Content overflows the mobile viewport")
            .unwrap();
        assert_eq!(overflow.occurrence_count, Some(1));
        assert!(fragment.scores.contains_key("mobileScore"));
    }
}
