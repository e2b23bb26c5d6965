use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::directory::{SessionDetail, SessionSummary};
use crate::export::ExportFormat;
use crate::extractor::ExtractionHints;

pub const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_HINT_SELECTORS: usize = 32;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub url: String,
    /// Analyze again even if a completed session exists for this URL.
    #[serde(default)]
    pub force: bool,
    /// CSS selectors for pages the default extraction gets wrong.
    #[serde(default)]
    pub hints: Option<ExtractionHints>,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(), String> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err("URL cannot be empty".to_string());
        }
        if url.len() > 2048 {
            return Err("URL too long".to_string());
        }
        if let Some(hints) = &self.hints
            && hints.exclude_selectors.len() > MAX_HINT_SELECTORS
        {
            return Err(format!("at most {MAX_HINT_SELECTORS} exclude selectors"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResponse {
    /// True when an earlier completed session was returned without re-running.
    pub reused: bool,
    pub session: SessionDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Maximum number of sessions, 1-100.
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    /// `json` (default), `text` or `markdown`.
    pub format: Option<ExportFormat>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable reason, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
