use chrono::Utc;
use reqwest::StatusCode;
use url::Url;

use crate::extractor::{ExtractionError, ExtractionHints, extract};
use crate::fetcher::PageResponse;

const DOC_ARTICLE: &str = include_str!("fixtures/doc_article.html");
const CONSENT_WALL: &str = include_str!("fixtures/consent_wall.html");

#[test]
fn test_extract_documentation_article() {
    let response = create_test_response(DOC_ARTICLE, "https://help.example.com/campaigns");
    let page = extract(&response, &ExtractionHints::default()).unwrap();

    assert!(page.title.contains("Create Your First Campaign"));
    assert_eq!(page.site_name, Some("Help Center".to_string()));
    assert_eq!(page.language, Some("en".to_string()));
    assert!(page.text.contains("verified sender"));
    assert!(page.text.contains("reports page shows delivery"));
    assert!(page.word_count() > 200);

    for chrome in ["Menu: Getting started", "Sidebar: Related", "All rights reserved", "window.analytics"] {
        assert!(!page.text.contains(chrome), "{chrome} leaked into article text");
    }
}

#[test]
fn test_reject_consent_wall() {
    let response = create_test_response(CONSENT_WALL, "https://example.com/blocked");
    let err = extract(&response, &ExtractionHints::default()).unwrap_err();

    assert!(matches!(err, ExtractionError::EmptyContent(_)));
}

#[test]
fn test_minimal_valid_content() {
    let html = format!(
        r#"<!DOCTYPE html><html><head><title>Valid Article</title></head><body><article><h1>Valid Article</h1><p>{}</p></article></body></html>"#,
        "This is a valid article with enough content to pass the minimum requirements for extraction. ".repeat(20)
    );

    let response = create_test_response(&html, "https://example.com/valid");
    let page = extract(&response, &ExtractionHints::default()).unwrap();

    assert_eq!(page.title, "Valid Article");
    assert!(page.text.chars().count() > 250);
    assert_eq!(page.url.as_str(), "https://example.com/valid");
}

#[test]
fn test_malformed_html_does_not_panic() {
    let html = "<html><head><title>Broken</title><body><p>Unclosed tags<div>More content";

    let response = create_test_response(html, "https://example.com/broken");
    // Too little text either way; the point is a typed error rather than a panic
    assert!(extract(&response, &ExtractionHints::default()).is_err());
}

fn create_test_response(html: &str, url: &str) -> PageResponse {
    let url = Url::parse(url).unwrap();
    PageResponse {
        url_requested: url.clone(),
        url_final: url,
        status: StatusCode::OK,
        content_type: "text/html; charset=utf-8".to_string(),
        charset: "UTF-8",
        body_utf8: html.to_string(),
        fetched_at: Utc::now(),
    }
}
