//! Visual consistency analyzer.
//!
//! Works from inline styles and presentational markup: unreadably small
//! text, content wider than the viewport, deprecated visual elements and
//! typography sprawl.

use super::dom::{snippets, style_px, style_value, Scope};
use super::{fragment_score, Analyzer, Pass};
use crate::browser::Page;
use crate::config::Thresholds;
use crate::error::AnalyzerError;
use crate::models::{Effort, Fragment, Impact, Issue, Recommendation, Severity};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use std::collections::BTreeSet;

const CATEGORY: &str = "visual";
const EVIDENCE_LIMIT: usize = 5;

/// Analyzer for visual presentation issues.
pub struct VisualAnalyzer {
    thresholds: Thresholds,
}

impl VisualAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

#[async_trait]
impl Analyzer for VisualAnalyzer {
    fn name(&self) -> &str {
        "visual"
    }

    fn supports(&self, pass: &Pass) -> bool {
        matches!(pass, Pass::Extended | Pass::Element { .. })
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
    let mut fragment = Fragment::new();

    let scope = match pass {
        Pass::Extended => Scope::document(&doc),
        Pass::Element { selector } => Scope::matching(&doc, selector)?,
        Pass::Quick | Pass::Mobile => return Ok(fragment),
    };

    if !scope.is_document() && scope.root_count() == 0 {
        return Ok(fragment);
    }

    check_font_sizes(&scope, thresholds, &mut fragment)?;
    check_overflow(&scope, viewport_width, &mut fragment)?;
    check_presentational_markup(&scope, &mut fragment)?;
    check_typography(&scope, &mut fragment)?;

    let key = if scope.is_document() {
        "visualScore"
    } else {
        "elementVisualScore"
    };
    fragment.score(key, fragment_score(&fragment));

    Ok(fragment)
}

fn check_font_sizes(
    scope: &Scope<'_>,
    thresholds: &Thresholds,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let minimum = thresholds.min_font_size_px as f32;
    let tiny: Vec<ElementRef<'_>> = scope
        .find("[style]")?
        .into_iter()
        .filter(|e| style_px(e, "font-size").is_some_and(|px| px < minimum))
        .collect();

    if !tiny.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} element(s) with text smaller than {}px", tiny.len(), minimum),
                Severity::Medium,
            )
            .description("Small text is hard to read, especially on high-density screens.")
            .remedy("Use a base font size of at least 16px and relative units.")
            .standard("WCAG 1.4.4")
            .evidence(snippets(&tiny, EVIDENCE_LIMIT))
            .occurrences(tiny.len()),
        );
    }

    Ok(())
}

fn check_overflow(
    scope: &Scope<'_>,
    viewport_width: u32,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let limit = viewport_width as f32;
    let wide: Vec<ElementRef<'_>> = scope
        .find("[style], img[width], table[width]")?
        .into_iter()
        .filter(|e| {
            let declared = style_px(e, "width").or_else(|| {
                e.value()
                    .attr("width")
                    .and_then(|w| w.trim().trim_end_matches("px").parse::<f32>().ok())
            });
            declared.is_some_and(|w| w > limit)
        })
        .collect();

    if !wide.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} element(s) wider than the {}px viewport", wide.len(), viewport_width),
                Severity::Medium,
            )
            .description("Fixed-width content forces horizontal scrolling.")
            .remedy("Use max-width: 100% and fluid layouts instead of fixed pixel widths.")
            .evidence(snippets(&wide, EVIDENCE_LIMIT))
            .occurrences(wide.len()),
        );
    }

    Ok(())
}

fn check_presentational_markup(
    scope: &Scope<'_>,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let legacy = scope.find("font, center, marquee, blink")?;
    if !legacy.is_empty() {
        fragment.push(
            Issue::new(CATEGORY, "Deprecated presentational elements", Severity::Low)
                .description("<font>, <center>, <marquee> and <blink> render inconsistently.")
                .remedy("Replace them with CSS.")
                .evidence(snippets(&legacy, EVIDENCE_LIMIT))
                .occurrences(legacy.len()),
        );
    }

    let styled = scope.count("[style]")?;
    fragment.metric("inlineStyleCount", styled);
    if styled > 20 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Move inline styles into stylesheets",
                Impact::Low,
                Effort::Medium,
            )
            .description(format!("{} elements carry inline styles.", styled))
            .suggestion("Use shared classes so the design stays consistent."),
        );
    }

    Ok(())
}

fn check_typography(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let mut families: BTreeSet<String> = BTreeSet::new();

    for el in scope.find("[style]")? {
        if let Some(family) = el
            .value()
            .attr("style")
            .and_then(|s| style_value(s, "font-family"))
        {
            if let Some(first) = family.split(',').next() {
                families.insert(first.trim().trim_matches(&['"', '\''][..]).to_lowercase());
            }
        }
    }
    for el in scope.find("font[face]")? {
        if let Some(face) = el.value().attr("face") {
            families.insert(face.trim().to_lowercase());
        }
    }

    fragment.metric("fontFamilies", families.len());
    if families.len() > 3 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Limit the number of font families",
                Impact::Low,
                Effort::Low,
            )
            .description(format!(
                "{} font families are used: {}.",
                families.len(),
                families.iter().cloned().collect::<Vec<_>>().join(", ")
            ))
            .suggestion("Stick to one or two families defined in the stylesheet."),
        );
    }

    Ok(())
}
