use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;
use utoipa::ToSchema;

static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());
static LINE_EDGE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^ +| +$").unwrap());

/// Cleaned article text plus metadata for one fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub url: Url,
    pub final_url: Url,
    pub title: String,
    pub site_name: Option<String>,
    pub language: Option<String>,
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

impl ExtractedPage {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Per-request filtering hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExtractionHints {
    /// Extra CSS selectors removed, with their content, before extraction.
    #[serde(default)]
    pub exclude_selectors: Vec<String>,
    /// CSS selector of the element holding the article, tried first.
    #[serde(default)]
    pub content_selector: Option<String>,
}

#[derive(Debug)]
pub struct ReadabilityResult {
    pub title: String,
    pub site_name: Option<String>,
    pub text: String,
}

pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let spaced = SPACE_REGEX.replace_all(text.trim(), " ");
    let trimmed_lines = LINE_EDGE_REGEX.replace_all(&spaced, "");
    NEWLINE_REGEX
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

/// Truncates `text` to at most `max_chars` characters, appending an ellipsis
/// when anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
