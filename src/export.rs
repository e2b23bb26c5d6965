//! Session reports as JSON, plain text or Markdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use utoipa::ToSchema;

use crate::analysis::{DetailSection, Dimension, DimensionOutcome};
use crate::directory::SessionDetail;
use crate::entities::{SessionId, SessionStatus};
use crate::scoring::ReadabilityMetrics;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
    Markdown,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

/// Complete JSON report structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub url: &'a str,
    pub session: SessionInfo<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readability: Option<&'a ReadabilityMetrics>,
    /// One entry per dimension, in name order
    pub dimensions: Vec<DimensionReport<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo<'a> {
    pub id: SessionId,
    pub title: Option<&'a str>,
    pub status: SessionStatus,
    pub language: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionReport<'a> {
    pub dimension: Dimension,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<&'a str>,
    #[serde(skip_serializing_if = "no_items")]
    pub recommendations: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    pub details: &'a [DetailSection],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

fn no_items<T>(items: &&[T]) -> bool {
    items.is_empty()
}

pub fn render(detail: &SessionDetail, format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => to_json(detail),
        ExportFormat::Text => Ok(to_text(detail)),
        ExportFormat::Markdown => Ok(to_markdown(detail)),
    }
}

pub fn to_json(detail: &SessionDetail) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&build_report(detail))
}

fn build_report(detail: &SessionDetail) -> JsonReport<'_> {
    let session = &detail.session;
    let mut dimensions: Vec<Dimension> = Dimension::ALL.to_vec();
    dimensions.sort();

    JsonReport {
        url: &session.url,
        session: SessionInfo {
            id: session.id,
            title: session.title.as_deref(),
            status: session.status,
            language: detail.document.as_ref().and_then(|d| d.language.as_deref()),
            created_at: session.created_at,
            completed_at: session.completed_at,
        },
        readability: session.readability.as_ref(),
        dimensions: dimensions
            .into_iter()
            .map(|dimension| match detail.outcome(dimension) {
                Some(DimensionOutcome::Completed(result)) => DimensionReport {
                    dimension,
                    available: true,
                    score: result.score,
                    verdict: Some(&result.verdict),
                    recommendations: &result.recommendations,
                    details: &result.details,
                    unavailable_reason: None,
                },
                Some(DimensionOutcome::Unavailable(failure)) => DimensionReport {
                    dimension,
                    available: false,
                    score: None,
                    verdict: None,
                    recommendations: &[],
                    details: &[],
                    unavailable_reason: Some(failure.to_string()),
                },
                None => DimensionReport {
                    dimension,
                    available: false,
                    score: None,
                    verdict: None,
                    recommendations: &[],
                    details: &[],
                    unavailable_reason: Some("not analyzed".to_string()),
                },
            })
            .collect(),
    }
}

pub fn to_text(detail: &SessionDetail) -> String {
    let report = build_report(detail);
    let mut out = String::new();

    let title = report.session.title.unwrap_or(report.url);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(out, "URL: {}", report.url);
    let _ = writeln!(out, "Session: {}", report.session.id);
    let _ = writeln!(out, "Status: {}", report.session.status.as_str());
    let _ = writeln!(out, "Created: {}", report.session.created_at.to_rfc3339());

    if let Some(metrics) = report.readability {
        let _ = writeln!(
            out,
            "Readability: Flesch reading ease {:.1} ({}), grade {:.1}, {} words",
            metrics.flesch_reading_ease,
            metrics.level.describe(),
            metrics.flesch_kincaid_grade,
            metrics.word_count
        );
    }

    for entry in &report.dimensions {
        let heading = capitalize(entry.dimension.as_str());
        let _ = writeln!(out, "\n{heading}\n{}", "-".repeat(heading.len()));

        if !entry.available {
            let reason = entry.unavailable_reason.as_deref().unwrap_or("unknown");
            let _ = writeln!(out, "Unavailable ({reason})");
            continue;
        }

        match (entry.dimension, entry.score) {
            (Dimension::Readability, Some(score)) => {
                let _ = writeln!(out, "Score: {score:.1}/100");
            }
            (_, Some(score)) => {
                let _ = writeln!(out, "Score: {score:.1}/10");
            }
            (_, None) => {
                let _ = writeln!(out, "Score: N/A");
            }
        }
        if let Some(verdict) = entry.verdict {
            let _ = writeln!(out, "{verdict}");
        }
        if !entry.recommendations.is_empty() {
            let _ = writeln!(out, "Suggestions:");
            for (n, recommendation) in entry.recommendations.iter().enumerate() {
                let _ = writeln!(out, "  {}. {recommendation}", n + 1);
            }
        }
    }

    out.trim_end().to_string()
}

/// The report a reader downloads: one section per dimension in pipeline
/// order, with the model's detail sections kept under their own headings.
pub fn to_markdown(detail: &SessionDetail) -> String {
    let report = build_report(detail);
    let mut out = String::new();

    let _ = writeln!(out, "# Documentation Analysis Report\n");
    let label = report.session.title.unwrap_or(report.url);
    let _ = writeln!(out, "## Article: [{label}]({})\n", report.url);
    let _ = writeln!(out, "- Session: `{}`", report.session.id);
    let _ = writeln!(out, "- Status: {}", report.session.status.as_str());
    let _ = writeln!(out, "- Created: {}", report.session.created_at.to_rfc3339());
    if let Some(metrics) = report.readability {
        let _ = writeln!(
            out,
            "- Flesch reading ease: {:.1} ({})",
            metrics.flesch_reading_ease,
            metrics.level.describe()
        );
        let _ = writeln!(out, "- Grade level: {:.1}", metrics.flesch_kincaid_grade);
        let _ = writeln!(out, "- Words: {}", metrics.word_count);
    }

    for dimension in Dimension::ALL {
        let _ = writeln!(out, "\n### {}\n", report_heading(dimension));
        let Some(entry) = report.dimensions.iter().find(|e| e.dimension == dimension) else {
            continue;
        };

        if !entry.available {
            match entry.unavailable_reason.as_deref() {
                Some("not analyzed") | None => {
                    let _ = writeln!(out, "_Not analyzed._");
                }
                Some(reason) => {
                    let _ = writeln!(out, "_Unavailable ({reason})_");
                }
            }
            continue;
        }

        match (dimension, entry.score) {
            (Dimension::Readability, Some(score)) => {
                let _ = writeln!(out, "**Score:** {score:.1}/100\n");
            }
            (_, Some(score)) => {
                let _ = writeln!(out, "**Score:** {score:.1}/10\n");
            }
            (_, None) => {
                let _ = writeln!(out, "**Score:** N/A\n");
            }
        }
        if let Some(verdict) = entry.verdict {
            let _ = writeln!(out, "#### Assessment\n\n{verdict}\n");
        }
        for section in entry.details {
            let _ = writeln!(out, "#### {}\n\n{}\n", section.heading, section.body);
        }
        if !entry.recommendations.is_empty() {
            let _ = writeln!(out, "#### Improvement Suggestions\n");
            for (n, recommendation) in entry.recommendations.iter().enumerate() {
                let _ = writeln!(out, "{}. {recommendation}", n + 1);
            }
        }
    }

    let mut out = out.trim_end().to_string();
    out.push('\n');
    out
}

fn report_heading(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Readability => "Readability for Marketers",
        Dimension::Structure => "Structure and Flow",
        Dimension::Completeness => "Completeness of Information",
        Dimension::Style => "Style Guide Adherence",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
