//! Accessibility analyzer.
//!
//! Quick pass: image alternatives, form labels, document language and
//! title. Extended pass adds heading structure, accessible names for links
//! and buttons, tab order and landmark checks. The element pass runs the
//! element-level rules inside the selected subtrees only.

use super::dom::{has_ancestor, snippets, text_of, Scope};
use super::{fragment_score, Analyzer, Pass};
use crate::browser::Page;
use crate::error::AnalyzerError;
use crate::models::{Effort, Fragment, Impact, Issue, Recommendation, Severity};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const CATEGORY: &str = "accessibility";
const EVIDENCE_LIMIT: usize = 5;

/// Analyzer for WCAG-oriented accessibility checks.
pub struct AccessibilityAnalyzer;

#[async_trait]
impl Analyzer for AccessibilityAnalyzer {
    fn name(&self) -> &str {
        "accessibility"
    }

    fn supports(&self, pass: &Pass) -> bool {
        matches!(pass, Pass::Quick | Pass::Extended | Pass::Element { .. })
    }

    async fn analyze(&self, page: &dyn Page, pass: &Pass) -> Result<Fragment, AnalyzerError> {
        let html = page.content().await?;
        inspect(&html, pass)
    }
}

fn inspect(html: &str, pass: &Pass) -> Result<Fragment, AnalyzerError> {
    let doc = Html::parse_document(html);
    let mut fragment = Fragment::new();

    match pass {
        Pass::Quick => {
            let scope = Scope::document(&doc);
            check_images(&scope, &mut fragment)?;
            check_form_labels(&scope, &mut fragment)?;
            check_document(&scope, &mut fragment)?;
            fragment.score("accessibilityQuickScore", fragment_score(&fragment));
        }
        Pass::Extended => {
            let scope = Scope::document(&doc);
            check_images(&scope, &mut fragment)?;
            check_form_labels(&scope, &mut fragment)?;
            check_document(&scope, &mut fragment)?;
            check_headings(&scope, &mut fragment)?;
            check_accessible_names(&scope, &mut fragment)?;
            check_tab_order(&scope, &mut fragment)?;
            check_landmarks(&scope, &mut fragment)?;
            fragment.score("accessibilityScore", fragment_score(&fragment));
        }
        Pass::Element { selector } => {
            let scope = Scope::matching(&doc, selector)?;
            fragment.metric("elementMatches", scope.root_count());
            if scope.root_count() > 0 {
                check_images(&scope, &mut fragment)?;
                check_form_labels(&scope, &mut fragment)?;
                check_accessible_names(&scope, &mut fragment)?;
                check_tab_order(&scope, &mut fragment)?;
                fragment.score("elementAccessibilityScore", fragment_score(&fragment));
            }
        }
        Pass::Mobile => {}
    }

    Ok(fragment)
}

fn check_images(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let images = scope.find("img")?;
    fragment.metric("imagesChecked", images.len());

    let missing: Vec<ElementRef<'_>> = images
        .iter()
        .filter(|img| img.value().attr("alt").is_none())
        .copied()
        .collect();

    if !missing.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} image(s) missing alternative text", missing.len()),
                Severity::High,
            )
            .description("Screen readers cannot describe images without an alt attribute.")
            .remedy("Add a descriptive alt attribute, or alt=\"\" for decorative images.")
            .standard("WCAG 1.1.1")
            .evidence(snippets(&missing, EVIDENCE_LIMIT))
            .occurrences(missing.len()),
        );
    }

    Ok(())
}

fn check_form_labels(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let labelled_ids: Vec<String> = scope
        .find("label[for]")?
        .iter()
        .filter_map(|l| l.value().attr("for").map(str::to_string))
        .collect();

    let controls = scope.find(
        "input:not([type=hidden]):not([type=submit]):not([type=button]):not([type=image]):not([type=reset]), select, textarea",
    )?;
    fragment.metric("formControlsChecked", controls.len());

    let unlabelled: Vec<ElementRef<'_>> = controls
        .iter()
        .filter(|c| {
            let attrs = c.value();
            let named = ["aria-label", "aria-labelledby", "title"]
                .iter()
                .any(|a| attrs.attr(a).is_some_and(|v| !v.trim().is_empty()));
            let by_for = attrs
                .id()
                .is_some_and(|id| labelled_ids.iter().any(|l| l == id));
            !(named || by_for || has_ancestor(c, "label"))
        })
        .copied()
        .collect();

    if !unlabelled.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} form control(s) without a label", unlabelled.len()),
                Severity::Critical,
            )
            .description("Assistive technology announces these fields without any name.")
            .remedy("Associate each control with a <label for> or give it an aria-label.")
            .standard("WCAG 1.3.1")
            .evidence(snippets(&unlabelled, EVIDENCE_LIMIT))
            .occurrences(unlabelled.len()),
        );
    }

    Ok(())
}

fn check_document(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    if !scope.is_document() {
        return Ok(());
    }

    let has_lang = scope
        .find("html")?
        .first()
        .and_then(|h| h.value().attr("lang"))
        .is_some_and(|l| !l.trim().is_empty());
    if !has_lang {
        fragment.push(
            Issue::new(CATEGORY, "Page language is not declared", Severity::Medium)
                .description("The <html> element has no lang attribute.")
                .remedy("Add lang=\"…\" to the <html> element, e.g. lang=\"en\".")
                .standard("WCAG 3.1.1"),
        );
    }

    let has_title = scope
        .find("title")?
        .iter()
        .any(|t| !text_of(t).is_empty());
    if !has_title {
        fragment.push(
            Issue::new(CATEGORY, "Page has no title", Severity::Medium)
                .description("The document title identifies the page in tabs and screen readers.")
                .remedy("Add a descriptive <title> to the document head.")
                .standard("WCAG 2.4.2"),
        );
    }

    Ok(())
}

fn check_headings(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let headings = scope.find("h1, h2, h3, h4, h5, h6")?;
    fragment.metric("headingCount", headings.len());

    let levels: Vec<u8> = headings
        .iter()
        .filter_map(|h| h.value().name().strip_prefix('h')?.parse::<u8>().ok())
        .collect();

    if !levels.contains(&1) {
        fragment.push(
            Issue::new(CATEGORY, "Page has no top-level heading", Severity::Low)
                .description("No <h1> element was found.")
                .remedy("Give the page one <h1> describing its main content.")
                .standard("WCAG 2.4.6"),
        );
    }

    let skips: Vec<String> = levels
        .windows(2)
        .filter(|w| w[1] > w[0] + 1)
        .map(|w| format!("h{} → h{}", w[0], w[1]))
        .collect();

    if !skips.is_empty() {
        fragment.push(
            Issue::new(CATEGORY, "Heading levels are skipped", Severity::Medium)
                .description("Skipped heading levels break the document outline.")
                .remedy("Nest headings one level at a time.")
                .standard("WCAG 1.3.1")
                .evidence(skips),
        );
    }

    Ok(())
}

fn check_accessible_names(
    scope: &Scope<'_>,
    fragment: &mut Fragment,
) -> Result<(), AnalyzerError> {
    let controls = scope.find("a[href], button")?;

    let nameless: Vec<ElementRef<'_>> = controls
        .iter()
        .filter(|c| {
            let attrs = c.value();
            let labelled = ["aria-label", "aria-labelledby", "title"]
                .iter()
                .any(|a| attrs.attr(a).is_some_and(|v| !v.trim().is_empty()));
            let image_alt = c
                .descendants()
                .filter_map(ElementRef::wrap)
                .any(|d| {
                    d.value().name() == "img"
                        && d.value().attr("alt").is_some_and(|a| !a.trim().is_empty())
                });
            !(labelled || image_alt || !text_of(c).is_empty())
        })
        .copied()
        .collect();

    if !nameless.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} link(s) or button(s) without an accessible name", nameless.len()),
                Severity::High,
            )
            .description("Controls without text are announced as just \"link\" or \"button\".")
            .remedy("Add visible text, an aria-label, or alt text on the contained image.")
            .standard("WCAG 4.1.2")
            .evidence(snippets(&nameless, EVIDENCE_LIMIT))
            .occurrences(nameless.len()),
        );
    }

    Ok(())
}

fn check_tab_order(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let positive: Vec<ElementRef<'_>> = scope
        .find("[tabindex]")?
        .into_iter()
        .filter(|e| {
            e.value()
                .attr("tabindex")
                .and_then(|t| t.trim().parse::<i32>().ok())
                .is_some_and(|t| t > 0)
        })
        .collect();

    if !positive.is_empty() {
        fragment.push(
            Issue::new(CATEGORY, "Positive tabindex overrides focus order", Severity::Low)
                .description("Keyboard focus no longer follows the visual order.")
                .remedy("Use tabindex=\"0\" or reorder the markup instead.")
                .standard("WCAG 2.4.3")
                .evidence(snippets(&positive, EVIDENCE_LIMIT))
                .occurrences(positive.len()),
        );
    }

    Ok(())
}

fn check_landmarks(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    if scope.count("main, [role=main]")? == 0 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Add a main landmark",
                Impact::Medium,
                Effort::Low,
            )
            .description("No <main> element or role=\"main\" region was found.")
            .suggestion("Wrap the primary content in a <main> element."),
        );
    }

    let has_skip_link = scope
        .find("a[href^='#']")?
        .iter()
        .any(|a| text_of(a).to_lowercase().contains("skip"));
    if !has_skip_link {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Provide a skip-to-content link",
                Impact::Quick,
                Effort::Low,
            )
            .description("Keyboard users must tab through the whole header on every page.")
            .suggestion("Add a visually hidden \"Skip to content\" link as the first focusable element."),
        );
    }

    Ok(())
}
