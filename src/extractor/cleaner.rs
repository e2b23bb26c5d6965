use scraper::{Html, Selector};
use tracing::warn;

use crate::extractor::model::ExtractionHints;

/// Page chrome removed, with its content, before readability runs.
const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav",
    "footer",
    "header",
    "aside",
    "[role='navigation']",
    "[class*='sidebar']",
    "[id*='sidebar']",
    "script",
    "style",
    "noscript",
];

/// Removes navigation and other boilerplate elements from a document and
/// returns the re-serialized HTML.
pub fn strip_boilerplate(html: &str, hints: &ExtractionHints) -> String {
    let mut document = Html::parse_document(html);

    let selectors = BOILERPLATE_SELECTORS
        .iter()
        .copied()
        .chain(hints.exclude_selectors.iter().map(String::as_str));

    let mut doomed = Vec::new();
    for raw in selectors {
        match Selector::parse(raw) {
            Ok(selector) => doomed.extend(document.select(&selector).map(|el| el.id())),
            Err(e) => warn!(selector = raw, error = %e, "ignoring invalid exclude selector"),
        }
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document.html()
}
