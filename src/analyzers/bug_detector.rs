//! Bug detector.
//!
//! Fast pass for markup defects that break pages outright: broken image
//! sources, dead links, duplicate ids and insecure subresources.

use super::dom::{snippets, Scope};
use super::{fragment_score, Analyzer, Pass};
use crate::browser::Page;
use crate::error::AnalyzerError;
use crate::models::{Effort, Fragment, Impact, Issue, Recommendation, Severity};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;

const CATEGORY: &str = "bug";
const EVIDENCE_LIMIT: usize = 5;

/// Analyzer for functional markup defects.
pub struct BugDetector;

#[async_trait]
impl Analyzer for BugDetector {
    fn name(&self) -> &str {
        "bug-detector"
    }

    fn supports(&self, pass: &Pass) -> bool {
        matches!(pass, Pass::Quick)
    }

    async fn analyze(&self, page: &dyn Page, _pass: &Pass) -> Result<Fragment, AnalyzerError> {
        let url = page.url().await.unwrap_or_default();
        let html = page.content().await?;
        inspect(&html, &url)
    }
}

fn inspect(html: &str, page_url: &str) -> Result<Fragment, AnalyzerError> {
    let doc = Html::parse_document(html);
    let scope = Scope::document(&doc);
    let mut fragment = Fragment::new();

    check_image_sources(&scope, &mut fragment)?;
    check_links(&scope, &mut fragment)?;
    check_duplicate_ids(&scope, &mut fragment)?;
    if page_url.starts_with("https://") {
        check_mixed_content(&scope, &mut fragment)?;
    }

    fragment.score("bugScore", fragment_score(&fragment));
    Ok(fragment)
}

fn check_image_sources(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let broken: Vec<ElementRef<'_>> = scope
        .find("img")?
        .into_iter()
        .filter(|img| {
            let src = img.value().attr("src").map(str::trim).unwrap_or("");
            let srcset = img.value().attr("srcset").map(str::trim).unwrap_or("");
            src.is_empty() && srcset.is_empty()
        })
        .collect();

    if !broken.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} image(s) with an empty source", broken.len()),
                Severity::High,
            )
            .description("These images render as broken placeholders.")
            .remedy("Point the src attribute at an existing image or remove the element.")
            .evidence(snippets(&broken, EVIDENCE_LIMIT))
            .occurrences(broken.len()),
        );
    }

    Ok(())
}

fn check_links(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let links = scope.find("a")?;
    fragment.metric("linkCount", links.len());

    let dead: Vec<ElementRef<'_>> = links
        .iter()
        .filter(|a| {
            let href = a.value().attr("href").map(str::trim);
            let has_handler = a.value().attr("onclick").is_some() || a.value().attr("role").is_some();
            match href {
                Some("") | Some("#") => !has_handler,
                _ => false,
            }
        })
        .copied()
        .collect();

    if !dead.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} link(s) that go nowhere", dead.len()),
                Severity::Low,
            )
            .description("Links with an empty or \"#\" href reload or jump to the top of the page.")
            .remedy("Give each link a real destination or turn it into a button.")
            .evidence(snippets(&dead, EVIDENCE_LIMIT))
            .occurrences(dead.len()),
        );
    }

    let scripted = links
        .iter()
        .filter(|a| {
            a.value()
                .attr("href")
                .is_some_and(|h| h.trim().to_lowercase().starts_with("javascript:"))
        })
        .count();

    if scripted > 0 {
        fragment.push(
            Recommendation::new(
                CATEGORY,
                "Replace javascript: links with buttons",
                Impact::Low,
                Effort::Low,
            )
            .description(format!("{} link(s) use a javascript: URL.", scripted))
            .suggestion("Use <button type=\"button\"> with an event listener."),
        );
    }

    Ok(())
}

fn check_duplicate_ids(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for el in scope.find("[id]")? {
        if let Some(id) = el.value().id() {
            *counts.entry(id.to_string()).or_default() += 1;
        }
    }

    let duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, n)| format!("#{} ({}×)", id, n))
        .collect();

    if !duplicates.is_empty() {
        fragment.push(
            Issue::new(
                CATEGORY,
                format!("{} duplicated element id(s)", duplicates.len()),
                Severity::Medium,
            )
            .description("Duplicate ids break label associations, anchors and scripts.")
            .remedy("Make every id unique within the document.")
            .standard("WCAG 4.1.1")
            .evidence(duplicates),
        );
    }

    Ok(())
}

fn check_mixed_content(scope: &Scope<'_>, fragment: &mut Fragment) -> Result<(), AnalyzerError> {
    let mut insecure: Vec<String> = Vec::new();

    for (css, attr) in [
        ("img[src]", "src"),
        ("script[src]", "src"),
        ("iframe[src]", "src"),
        ("link[rel=stylesheet][href]", "href"),
    ] {
        for el in scope.find(css)? {
            if let Some(target) = el.value().attr(attr) {
                if target.trim().starts_with("http://") {
                    insecure.push(target.trim().to_string());
                }
            }
        }
    }

    if !insecure.is_empty() {
        let count = insecure.len();
        insecure.truncate(EVIDENCE_LIMIT);
        fragment.push(
            Issue::new(
                CATEGORY,
                "Insecure resources on a secure page",
                Severity::High,
            )
            .description("Browsers block or warn about http:// subresources on https:// pages.")
            .remedy("Load every resource over https://.")
            .evidence(insecure)
            .occurrences(count),
        );
    }

    Ok(())
}
