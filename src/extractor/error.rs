use thiserror::Error;

use crate::fetcher::FetchError;

/// Why a URL could not be turned into analysable text. Every variant is
/// fatal to an analysis request.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("host unreachable: {0}")]
    UnreachableHost(String),

    #[error("timed out fetching page")]
    Timeout,

    #[error("page returned http {status}")]
    Http { status: u16 },

    #[error("redirect rejected: {0}")]
    RedirectRejected(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("page too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("page could not be decoded: {0}")]
    Undecodable(String),

    #[error("no readable content: {0}")]
    EmptyContent(String),

    #[error("fetcher unavailable: {0}")]
    Client(String),
}

impl ExtractionError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::UnreachableHost(_) => "unreachable_host",
            Self::Timeout => "timeout",
            Self::Http { .. } => "http_error",
            Self::RedirectRejected(_) => "redirect_rejected",
            Self::UnsupportedContentType(_) => "unsupported_content_type",
            Self::BodyTooLarge(_) => "body_too_large",
            Self::Undecodable(_) => "undecodable",
            Self::EmptyContent(_) => "empty_content",
            Self::Client(_) => "client_error",
        }
    }
}

impl From<FetchError> for ExtractionError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(e) => Self::InvalidUrl(e.to_string()),
            FetchError::UnsupportedScheme(scheme) => {
                Self::InvalidUrl(format!("unsupported scheme '{scheme}'"))
            }
            FetchError::Unreachable(msg) | FetchError::Io(msg) => Self::UnreachableHost(msg),
            FetchError::ConnectTimeout | FetchError::RequestTimeout => Self::Timeout,
            FetchError::RedirectRejected(msg) => Self::RedirectRejected(msg),
            FetchError::Http { status, .. } => Self::Http {
                status: status.as_u16(),
            },
            FetchError::BodyTooLarge(size) => Self::BodyTooLarge(size),
            FetchError::UnsupportedContentType(ct) => Self::UnsupportedContentType(ct),
            FetchError::Charset(msg) => Self::Undecodable(msg),
            FetchError::Client(msg) => Self::Client(msg),
        }
    }
}
