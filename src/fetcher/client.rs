use crate::fetcher::{
    errors::FetchError,
    pipeline::process_response,
    types::{FetchConfig, PageResponse},
};
use reqwest::{Client, ClientBuilder, header, redirect};
use tracing::{debug, instrument};
use url::Url;

/// HTTP client for single-page fetches.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy(
                config.max_redirects,
                config.max_off_host_redirects,
            ))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                );
                headers
            })
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<PageResponse, FetchError> {
        let parsed_url = Url::parse(url)?;
        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(parsed_url.scheme().to_string()));
        }

        let response = self
            .client
            .get(parsed_url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let max_body = self.config.max_body_size;
        if let Some(content_length) = response.content_length()
            && content_length > max_body
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let final_url = response.url().clone();
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http {
                status,
                retriable: status.is_server_error(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let body = response
            .bytes()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        // Content-Length may be missing or wrong for compressed bodies
        if body.len() as u64 > max_body {
            return Err(FetchError::BodyTooLarge(body.len() as u64));
        }

        debug!(final_url = %final_url, bytes = body.len(), "page downloaded");
        process_response(parsed_url, final_url, status, &content_type, &body)
    }
}

/// Follows at most `max_total` hops, of which at most `max_off_host` may
/// move to a different host than the URL they came from.
fn redirect_policy(max_total: usize, max_off_host: usize) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        let previous = attempt.previous();
        if previous.len() > max_total {
            return attempt.error(format!("more than {max_total} redirects"));
        }

        let host_changes = previous
            .windows(2)
            .filter(|pair| changes_host(&pair[0], &pair[1]))
            .count()
            + previous
                .last()
                .is_some_and(|last| changes_host(last, attempt.url())) as usize;

        if host_changes > max_off_host {
            let target = attempt.url().to_string();
            return attempt.error(format!(
                "redirect to {target} changes host more than {max_off_host} time(s)"
            ));
        }

        attempt.follow()
    })
}

fn changes_host(from: &Url, to: &Url) -> bool {
    from.host_str() != to.host_str()
}
