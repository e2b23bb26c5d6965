use readability::extractor;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::extractor::model::{ExtractionHints, ReadabilityResult};

/// Containers tried, in order, when readability finds nothing usable.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".markdown-body",
    ".content",
    ".article",
    "#content",
    "#main",
    ".entry-content",
    "body",
];

/// Shortest fallback container text accepted before moving on to the next one.
const MIN_CONTAINER_CHARS: usize = 100;

/// `raw_html` supplies metadata; `clean_html` has had boilerplate removed and
/// is what the article text comes from.
pub fn extract(
    raw_html: &str,
    clean_html: &str,
    url: &Url,
    hints: &ExtractionHints,
) -> Option<ReadabilityResult> {
    let raw = Html::parse_document(raw_html);
    let site_name = extract_site_name(&raw);
    let meta_title = extract_title(&raw);

    // An explicit content selector beats readability's scoring
    if let Some(selector) = hints.content_selector.as_deref()
        && let Some(text) = select_text(&Html::parse_document(clean_html), selector, 1)
    {
        return Some(ReadabilityResult {
            title: meta_title.unwrap_or_default(),
            site_name,
            text,
        });
    }

    if let Ok(article) = extractor::extract(&mut clean_html.as_bytes(), url)
        && !article.text.trim().is_empty()
    {
        let title = if article.title.trim().is_empty() {
            meta_title.unwrap_or_default()
        } else {
            article.title.trim().to_string()
        };
        return Some(ReadabilityResult {
            title,
            site_name,
            text: article.text,
        });
    }

    let clean = Html::parse_document(clean_html);
    let text = CONTENT_SELECTORS
        .iter()
        .find_map(|selector| select_text(&clean, selector, MIN_CONTAINER_CHARS))?;

    Some(ReadabilityResult {
        title: meta_title.unwrap_or_default(),
        site_name,
        text,
    })
}

fn select_text(document: &Html, selector: &str, min_chars: usize) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(block_text)
        .find(|text| text.trim().chars().count() >= min_chars)
}

/// Text of an element with block boundaries kept as line breaks.
fn block_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = node.value().as_element()
            && matches!(
                el.name(),
                "p" | "div" | "li" | "br" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "tr"
            )
        {
            out.push('\n');
        }
    }
    out
}

fn extract_site_name(document: &Html) -> Option<String> {
    if let Some(content) = meta_content(document, "meta[property='og:site_name']") {
        return Some(content);
    }

    // "Article Title - Site Name" or "Article Title | Site Name"
    let title = first_text(document, "title")?;
    title
        .rsplit_once(" | ")
        .or_else(|| title.rsplit_once(" - "))
        .map(|(_, site)| site.trim().to_string())
        .filter(|site| !site.is_empty())
}

fn extract_title(document: &Html) -> Option<String> {
    meta_content(document, "meta[property='og:title']")
        .or_else(|| first_text(document, "title"))
        .or_else(|| first_text(document, "h1"))
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}
