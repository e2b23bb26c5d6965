//! Four-dimension quality analysis of extracted text.

pub mod backoff;
pub mod orchestrator;
pub mod parser;
pub mod prompts;

pub use orchestrator::{Analyzer, AnalyzerConfig};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::llm::LlmError;

/// Quality dimension. Variants are declared alphabetically so the derived
/// ordering matches display order by name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Completeness,
    Readability,
    Structure,
    Style,
}

impl Dimension {
    /// Every dimension, in the order prompts are issued.
    pub const ALL: [Dimension; 4] = [
        Dimension::Readability,
        Dimension::Structure,
        Dimension::Completeness,
        Dimension::Style,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completeness => "completeness",
            Self::Readability => "readability",
            Self::Structure => "structure",
            Self::Style => "style",
        }
    }

    /// Sections the model is asked for between the assessment and the
    /// suggestions.
    pub fn detail_sections(self) -> &'static [&'static str] {
        match self {
            Self::Readability => &["Problem Areas"],
            Self::Structure => &["Structural Elements", "Flow Issues"],
            Self::Completeness => &["Information Gaps", "Example Quality"],
            Self::Style => &["Voice and Tone", "Language Issues"],
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completeness" => Ok(Self::Completeness),
            "readability" => Ok(Self::Readability),
            "structure" => Ok(Self::Structure),
            "style" => Ok(Self::Style),
            _ => Err(UnknownDimension(s.to_string())),
        }
    }
}

/// Structured verdict for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    /// Flesch reading ease for readability, 0-10 for the other dimensions;
    /// null when the model declined to score.
    pub score: Option<f64>,
    pub verdict: String,
    pub recommendations: Vec<String>,
    /// Dimension-specific sections, in the order the model wrote them.
    #[serde(default)]
    pub details: Vec<DetailSection>,
    pub raw_response: String,
}

/// A titled section of a model answer other than the assessment and the
/// suggestions, e.g. "Problem Areas" or "Flow Issues".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DetailSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    RateLimited,
    AuthFailure,
    Rejected,
    UnparseableResponse,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::RateLimited => "rate_limited",
            Self::AuthFailure => "auth_failure",
            Self::Rejected => "rejected",
            Self::UnparseableResponse => "unparseable_response",
            Self::Internal => "internal",
        }
    }

    /// Inverse of [`FailureKind::as_str`]; unknown values read back as
    /// `Internal`.
    pub fn parse(s: &str) -> Self {
        match s {
            "timeout" => Self::Timeout,
            "transport" => Self::Transport,
            "rate_limited" => Self::RateLimited,
            "auth_failure" => Self::AuthFailure,
            "rejected" => Self::Rejected,
            "unparseable_response" => Self::UnparseableResponse,
            _ => Self::Internal,
        }
    }
}

/// Why a dimension is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, ToSchema)]
#[error("{}: {}", .kind.as_str(), .message)]
pub struct AnalysisFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AnalysisFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<LlmError> for AnalysisFailure {
    fn from(err: LlmError) -> Self {
        let kind = match &err {
            LlmError::Timeout => FailureKind::Timeout,
            LlmError::RateLimited { .. } => FailureKind::RateLimited,
            LlmError::AuthFailure(_) => FailureKind::AuthFailure,
            LlmError::BadRequest { .. } => FailureKind::Rejected,
            LlmError::Server { .. } | LlmError::Transport(_) => FailureKind::Transport,
            LlmError::InvalidResponse(_) => FailureKind::UnparseableResponse,
        };
        Self::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DimensionOutcome {
    Completed(AnalysisResult),
    Unavailable(AnalysisFailure),
}

impl DimensionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Unavailable(_) => None,
        }
    }
}

/// One outcome per dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisReport {
    pub outcomes: BTreeMap<Dimension, DimensionOutcome>,
}

impl AnalysisReport {
    pub fn completed(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_completed()).count()
    }

    pub fn unavailable(&self) -> Vec<Dimension> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_completed())
            .map(|(d, _)| *d)
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("analysis cancelled")]
    Cancelled,
}
