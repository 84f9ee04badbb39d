//! Performance analyzer.
//!
//! Quick pass measures load timing, document weight and DOM size. The
//! extended pass adds render-blocking resources, image loading and
//! layout-shift heuristics.

use super::dom::{snippets, Scope};
use super::{fragment_score, Analyzer, Pass};
use crate::browser::{Page, PageTiming};
use crate::config::Thresholds;
use crate::error::{AnalyzerError, BrowserError};
use crate::models::{Effort, Fragment, Impact, Issue, Recommendation, Severity};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::debug;

const CATEGORY: &str = "performance";
const EVIDENCE_LIMIT: usize = 5;

/// Navigation timing as reported by a script-capable backend.
const NAVIGATION_TIMING_SCRIPT: &str = r#"(() => {
  const t = performance.getEntriesByType('navigation')[0];
  return {
    timeToFirstByteMs: Math.round(t.responseStart - t.startTime),
    loadTimeMs: Math.round(t.loadEventEnd - t.startTime),
    transferBytes: t.transferSize
  };
})()"#;

/// Analyzer for load performance.
pub struct PerformanceAnalyzer {
    thresholds: Thresholds,
}

impl PerformanceAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Navigation timing from script evaluation, or from the backend when
    /// the backend cannot evaluate scripts.
    async fn timing(&self, page: &dyn Page) -> Result<PageTiming, AnalyzerError> {
        match page.evaluate(NAVIGATION_TIMING_SCRIPT).await {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| AnalyzerError::Internal(format!("bad navigation timing: {}", e))),
            Err(BrowserError::Unsupported(_)) => {
                debug!("Script evaluation unsupported, using backend timing");
                Ok(page.timing().await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Analyzer for PerformanceAnalyzer {
    fn name(&self) -> &str {
        "performance"
    }

    fn supports(&self, pass: &Pass) -> bool {
        matches!(pass, Pass::Quick | Pass::Extended)
    }

    async fn analyze(&self, page: &dyn Page, pass: &Pass) -> Result<Fragment, AnalyzerError> {
        let timing = self.timing(page).await?;
        let html = page.content().await?;
        inspect(&html, timing, pass, &self.thresholds)
    }
}

fn inspect(
    html: &str,
    timing: PageTiming,
    pass: &Pass,
    thresholds: &Thresholds,
) -> Result<Fragment, AnalyzerError> {
    let doc = Html::parse_document(html);
    let scope = Scope::document(&doc);
    let mut fragment = Fragment::new();

    match pass {
        Pass::Quick => {
            check_timing(&timing, thresholds, &mut fragment);
            check_weight(&scope, &timing, thresholds, &mut fragment)?;
            fragment.score("performanceQuickScore", fragment_score(&fragment));
        }
        Pass::Extended => {
            check_timing(&timing, thresholds, &mut fragment);
            check_weight(&scope, &timing, thresholds, &mut fragment)?;
            check_blocking_resources(&scope, thresholds, &mut fragment)?;
            check_images(&scope, &mut fragment)?;
            fragment.score("performanceScore", fragment_score(&fragment));
        }
        Pass::Element { .. } | Pass::Mobile => {}
    }

    Ok(fragment)
}

fn check_timing(timing: &PageTiming, thresholds: &Thresholds, fragment: &mut Fragment) {
    fragment.metric("loadTimeMs", timing.load_time_ms);
    fragment.metric("timeToFirstByteMs", timing.time_to_first_byte_ms);

    let limit = thresholds.load_time_ms;
    if timing.load_time_ms > limit {
        let severity = if timing.load_time_ms > limit * 2 {
            Severity::Critical
        } else {
            Severity::High
        };
        fragment.push(
            Issue::new(CATEGORY, "Slow page load", severity)
                .description(format!(
                    "The page took {}ms to load (budget {}ms).",
                    timing.load_time_ms, limit
                ))
                .remedy("Reduce server response time, defer non-critical work and compress assets."),
        );
    }
}

fn check_weight(
    scope: &Scope<'_>,
    timing: &PageTiming,
    thresholds: &Thresholds,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let dom_size = scope.count("*")?;
    fragment.metric("domSize", dom_size);
    fragment.metric("transferBytes", timing.transfer_bytes);
    fragment.metric("scriptCount", scope.count("script")?);
    fragment.metric("stylesheetCount", scope.count("link[rel=stylesheet]")?);
    fragment.metric("imageCount", scope.count("img")?);

    if dom_size > thresholds.dom_size {
        fragment.push(
            Issue::new(CATEGORY, "Excessive DOM size", Severity::Medium)
                .description(format!(
                    "The document has {} elements (budget {}).",
                    dom_size, thresholds.dom_size
                ))
                .remedy("Paginate or virtualize long lists and remove wrapper elements.")
                .occurrences(dom_size),
        );
    }

    if timing.transfer_bytes > thresholds.page_weight_bytes {
        fragment.push(
            Issue::new(CATEGORY, "Heavy document", Severity::Medium)
                .description(format!(
                    "The document weighs {} KB (budget {} KB).",
                    timing.transfer_bytes / 1024,
                    thresholds.page_weight_bytes / 1024
                ))
                .remedy("Enable compression and move inline data out of the markup."),
        );
    }

    Ok(())
}

fn check_blocking_resources(
    scope: &Scope<'_>,
    thresholds: &Thresholds,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let blocking = scope.find("head script[src]:not([async]):not([defer]):not([type=module])")?;
    fragment.metric("renderBlockingScripts", blocking.len());

    if blocking.len() > thresholds.blocking_scripts {
        fragment.push(
            Issue::new(CATEGORY, "Render-blocking scripts in <head>", Severity::Medium)
                .description(format!(
                    "{} synchronous scripts delay first paint.",
                    blocking.len()
                ))
                .remedy("Add async or defer, or move the scripts to the end of <body>.")
                .evidence(snippets(&blocking, EVIDENCE_LIMIT))
                .occurrences(blocking.len()),
        );
    }

    let stylesheets = scope.count("link[rel=stylesheet]")?;
    if stylesheets > 5 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Bundle stylesheets",
                Impact::Medium,
                Effort::Medium,
            )
            .description(format!("The page loads {} separate stylesheets.", stylesheets))
            .suggestion("Combine stylesheets and inline the critical CSS."),
        );
    }

    let inline_script_bytes: usize = scope
        .find("script:not([src])")?
        .iter()
        .map(|s| s.text().map(str::len).sum::<usize>())
        .sum();
    fragment.metric("inlineScriptBytes", inline_script_bytes);

    if inline_script_bytes > 50 * 1024 {
        fragment.push(
            Issue::new(CATEGORY, "Large inline scripts", Severity::Low)
                .description(format!(
                    "{} KB of inline script cannot be cached.",
                    inline_script_bytes / 1024
                ))
                .remedy("Move inline scripts into cacheable external files."),
        );
    }

    Ok(())
}

fn check_images(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let images = scope.find("img")?;

    let unsized_images: Vec<ElementRef<'_>> = images
        .iter()
        .filter(|i| i.value().attr("width").is_none() || i.value().attr("height").is_none())
        .copied()
        .collect();

    if !unsized_images.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} image(s) without explicit dimensions", unsized_images.len()),
                Severity::Low,
            )
            .description("Images without width and height shift the layout while loading.")
            .remedy("Set width and height attributes on every image.")
            .evidence(snippets(&unsized_images, EVIDENCE_LIMIT))
            .occurrences(unsized_images.len()),
        );
    }

    let eager = images
        .iter()
        .filter(|i| i.value().attr("loading") != Some("lazy"))
        .count();

    if eager > 3 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Lazy-load offscreen images",
                Impact::Quick,
                Effort::Low,
            )
            .description(format!("{} images are loaded eagerly.", eager))
            .suggestion("Add loading=\"lazy\" to images below the fold."),
        );
    }

    Ok(())
}
