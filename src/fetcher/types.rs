use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "DocAuditBot/0.1 (+https://github.com/docaudit/docaudit)";

/// Total redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Redirect hops that may land on a host other than the requested one.
pub const MAX_OFF_HOST_REDIRECTS: usize = 1;

/// Largest body accepted, in bytes.
pub const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    pub max_off_host_redirects: usize,
    pub max_body_size: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: MAX_REDIRECTS,
            max_off_host_redirects: MAX_OFF_HOST_REDIRECTS,
            max_body_size: MAX_BODY_SIZE,
        }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A fetched HTML page decoded to UTF-8.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub url_requested: Url,
    pub url_final: Url,
    pub status: StatusCode,
    pub content_type: String,
    /// WHATWG name of the encoding the body was decoded from.
    pub charset: &'static str,
    pub body_utf8: String,
    pub fetched_at: DateTime<Utc>,
}
