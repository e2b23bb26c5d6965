//! Turns a model's markdown answer into an [`AnalysisResult`].

use regex::Regex;
use std::sync::LazyLock;

use super::{AnalysisFailure, AnalysisResult, DetailSection, Dimension, FailureKind};

static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*_#]*score[\s*_]*:[\s*_]*(n/?a|\d+(?:\.\d+)?)(?:\s*/\s*10)?").unwrap()
});
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#{1,6}\s*(.*?)\s*#*\s*$").unwrap());
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+(.+)$").unwrap());

/// Parses `raw`. `readability_ease` replaces the model's score for the
/// readability dimension, which is scored by formula rather than opinion.
pub fn parse_response(
    dimension: Dimension,
    raw: &str,
    readability_ease: f64,
) -> Result<AnalysisResult, AnalysisFailure> {
    let sections = split_sections(raw);

    let verdict = sections
        .iter()
        .find(|section| section.is_assessment())
        .map(|section| section.text())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AnalysisFailure::new(
                FailureKind::UnparseableResponse,
                format!("{dimension} response has no assessment section"),
            )
        })?;

    let recommendations = sections
        .iter()
        .find(|section| section.is_suggestions())
        .map(|section| list_items(&section.lines))
        .unwrap_or_default();

    let details = sections
        .iter()
        .filter(|section| !section.is_assessment() && !section.is_suggestions() && !section.is_score())
        .filter_map(|section| {
            let body = section.text();
            (!body.is_empty()).then(|| DetailSection {
                heading: section.heading.to_string(),
                body,
            })
        })
        .collect();

    let score = match dimension {
        Dimension::Readability => Some(readability_ease),
        _ => model_score(raw),
    };

    Ok(AnalysisResult {
        score,
        verdict,
        recommendations,
        details,
        raw_response: raw.to_string(),
    })
}

/// `None` for `N/A` or a missing score line.
fn model_score(raw: &str) -> Option<f64> {
    let value = SCORE_LINE.captures(raw)?.get(1)?.as_str();
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 10.0))
}

struct Section<'a> {
    heading: &'a str,
    lines: Vec<&'a str>,
}

impl Section<'_> {
    fn matches(&self, word: &str) -> bool {
        self.heading.to_lowercase().contains(word)
    }

    fn is_assessment(&self) -> bool {
        self.matches("assessment")
    }

    fn is_suggestions(&self) -> bool {
        self.matches("suggestion") || self.matches("recommendation")
    }

    fn is_score(&self) -> bool {
        self.heading.to_lowercase().starts_with("score")
    }

    fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }
}

/// Markdown headings with the lines under each.
fn split_sections(raw: &str) -> Vec<Section<'_>> {
    let mut sections: Vec<Section<'_>> = Vec::new();
    for line in raw.lines() {
        if let Some(caps) = HEADING.captures(line) {
            let heading = caps.get(1).map_or("", |m| m.as_str());
            sections.push(Section {
                heading,
                lines: Vec::new(),
            });
        } else if let Some(section) = sections.last_mut() {
            section.lines.push(line);
        }
    }
    sections
}

/// Numbered or bulleted items; indented continuation lines join the item
/// above them.
fn list_items(lines: &[&str]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in lines {
        if let Some(caps) = LIST_ITEM.captures(line) {
            items.push(caps[1].trim().to_string());
        } else if !line.trim().is_empty()
            && line.starts_with(char::is_whitespace)
            && let Some(last) = items.last_mut()
        {
            last.push(' ');
            last.push_str(line.trim());
        }
    }
    items
}
