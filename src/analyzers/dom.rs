//! DOM query helpers shared by the analyzers.
//!
//! `scraper::Html` is not `Send`, so documents are parsed and queried
//! inside synchronous functions and never held across an `.await`.

use crate::error::AnalyzerError;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Longest evidence snippet kept per element.
const SNIPPET_LIMIT: usize = 120;

/// Parses a CSS selector.
pub fn selector(css: &str) -> Result<Selector, AnalyzerError> {
    Selector::parse(css).map_err(|e| AnalyzerError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}

/// The part of a document a set of checks runs against.
pub struct Scope<'a> {
    roots: Vec<ElementRef<'a>>,
    whole_document: bool,
}

impl<'a> Scope<'a> {
    /// The whole document.
    pub fn document(doc: &'a Html) -> Self {
        Self {
            roots: vec![doc.root_element()],
            whole_document: true,
        }
    }

    /// The subtrees rooted at every element matching `css`.
    pub fn matching(doc: &'a Html, css: &str) -> Result<Self, AnalyzerError> {
        let sel = selector(css)?;
        Ok(Self {
            roots: doc.select(&sel).collect(),
            whole_document: false,
        })
    }

    pub fn is_document(&self) -> bool {
        self.whole_document
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Elements in scope matching `css`, roots included, in document order.
    pub fn find(&self, css: &str) -> Result<Vec<ElementRef<'a>>, AnalyzerError> {
        let sel = selector(css)?;

        if let [root] = self.roots.as_slice() {
            let mut found: Vec<ElementRef<'a>> = root.select(&sel).collect();
            if sel.matches(root) && found.first().map(|e| e.id()) != Some(root.id()) {
                found.insert(0, *root);
            }
            return Ok(found);
        }

        // Roots may be nested inside each other.
        let mut seen = HashSet::new();
        let mut found: Vec<ElementRef<'a>> = Vec::new();
        for root in &self.roots {
            let own = sel.matches(root).then_some(*root);
            for el in own.into_iter().chain(root.select(&sel)) {
                if seen.insert(el.id()) {
                    found.push(el);
                }
            }
        }

        Ok(found)
    }

    pub fn count(&self, css: &str) -> Result<usize, AnalyzerError> {
        Ok(self.find(css)?.len())
    }
}

/// Outer HTML of `el`, truncated for use as evidence.
pub fn snippet(el: &ElementRef<'_>) -> String {
    let html = el.html();
    let html = html.split_whitespace().collect::<Vec<_>>().join(" ");
    if html.chars().count() > SNIPPET_LIMIT {
        let cut: String = html.chars().take(SNIPPET_LIMIT).collect();
        format!("{}…", cut)
    } else {
        html
    }
}

/// Evidence for up to `limit` elements.
pub fn snippets(elements: &[ElementRef<'_>], limit: usize) -> Vec<String> {
    elements.iter().take(limit).map(snippet).collect()
}

/// Visible text of `el`, whitespace-collapsed.
pub fn text_of(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `el` sits inside an element named `tag`.
pub fn has_ancestor(el: &ElementRef<'_>, tag: &str) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == tag)
}

/// Value of a declaration in an inline `style` attribute.
pub fn style_value<'s>(style: &'s str, property: &str) -> Option<&'s str> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Pixel value of an inline style declaration (`12px`, `12.5px`).
pub fn style_px(el: &ElementRef<'_>, property: &str) -> Option<f32> {
    let style = el.value().attr("style")?;
    let value = style_value(style, property)?;
    let number = value
        .trim_end_matches("!important")
        .trim()
        .strip_suffix("px")?;
    number.trim().parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <main id="content"><img src="a.png"><p>Hello <b>world</b></p></main>
        <aside><img src="b.png"></aside>
        <label>Name <input id="name"></label>
    </body></html>"#;

    #[test]
    fn test_document_scope() {
        let doc = Html::parse_document(PAGE);
        let scope = Scope::document(&doc);
        assert!(scope.is_document());
        assert_eq!(scope.count("img").unwrap(), 2);
    }

    #[test]
    fn test_element_scope_includes_root() {
        let doc = Html::parse_document(PAGE);
        let scope = Scope::matching(&doc, "main").unwrap();
        assert_eq!(scope.root_count(), 1);
        assert_eq!(scope.count("img").unwrap(), 1);
        assert_eq!(scope.count("main").unwrap(), 1);

        let scope = Scope::matching(&doc, "img").unwrap();
        assert_eq!(scope.count("img").unwrap(), 2);
    }

    #[test]
    fn test_nested_roots_are_not_counted_twice() {
        let doc = Html::parse_document(
            r#"<html><body><div class="box"><div class="box"><p>a</p></div><p>b</p></div></body></html>"#,
        );
        let scope = Scope::matching(&doc, ".box").unwrap();
        assert_eq!(scope.root_count(), 2);
        assert_eq!(scope.count("p").unwrap(), 2);
        assert_eq!(scope.count(".box").unwrap(), 2);
    }

    #[test]
    fn test_large_document_count() {
        let body = "<div><span>x</span></div>".repeat(20_000);
        let doc = Html::parse_document(&format!("<html><head></head><body>{}</body></html>", body));
        let scope = Scope::document(&doc);

        // html, head, body plus two elements per repetition
        assert_eq!(scope.count("*").unwrap(), 40_003);
        assert_eq!(scope.count("span").unwrap(), 20_000);
        assert_eq!(scope.count("html").unwrap(), 1);
    }

    #[test]
    fn test_invalid_selector() {
        let err = selector("div[").unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidSelector { .. }));
    }

    #[test]
    fn test_text_and_ancestors() {
        let doc = Html::parse_document(PAGE);
        let scope = Scope::document(&doc);
        let p = scope.find("p").unwrap();
        assert_eq!(text_of(&p[0]), "Hello world");

        let input = scope.find("input").unwrap();
        assert!(has_ancestor(&input[0], "label"));
        assert!(!has_ancestor(&p[0], "label"));
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!(
            style_value("color: red; Width: 500px", "width"),
            Some("500px")
        );
        assert_eq!(style_value("color: red", "width"), None);

        let doc = Html::parse_document(
            r#"<div style="width: 480px; font-size: 10.5px !important"></div>"#,
        );
        let scope = Scope::document(&doc);
        let div = scope.find("div").unwrap();
        assert_eq!(style_px(&div[0], "width"), Some(480.0));
        assert_eq!(style_px(&div[0], "font-size"), Some(10.5));
        assert_eq!(style_px(&div[0], "height"), None);
    }

    #[test]
    fn test_snippet_truncation() {
        let long = format!("<p>{}</p>", "x".repeat(300));
        let doc = Html::parse_fragment(&long);
        let sel = selector("p").unwrap();
        let p = doc.select(&sel).next().unwrap();
        let s = snippet(&p);
        assert!(s.ends_with('…'));
        assert_eq!(s.chars().count(), SNIPPET_LIMIT + 1);
    }
}
