use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("rate limited by model provider")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("model provider rejected credentials: {0}")]
    AuthFailure(String),

    #[error("model request timed out")]
    Timeout,

    #[error("model provider returned http {status}: {body}")]
    Server { status: u16, body: String },

    #[error("model request was rejected with http {status}: {body}")]
    BadRequest { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response from model provider: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Failures worth one more attempt: the request itself was fine.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Transport(_) => true,
            Self::Server { status, .. } => *status >= 500,
            Self::AuthFailure(_) | Self::BadRequest { .. } | Self::InvalidResponse(_) => false,
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: String, retry_after: Option<u64>) -> Self {
        match status.as_u16() {
            401 | 403 => Self::AuthFailure(body),
            429 => Self::RateLimited {
                retry_after_secs: retry_after,
            },
            408 | 504 => Self::Timeout,
            code if code >= 500 => Self::Server { status: code, body },
            code => Self::BadRequest { status: code, body },
        }
    }
}
