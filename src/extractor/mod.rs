//! Extraction adapter: URL in, cleaned prose out.

pub mod cleaner;
pub mod error;
pub mod language;
pub mod model;
pub mod reader;
pub mod reject;

#[cfg(test)]
mod tests;

pub use error::ExtractionError;
pub use model::{ExtractedPage, ExtractionHints, normalize_whitespace, preview};

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::fetcher::{Fetcher, PageResponse};

/// Anything that can turn a URL into an [`ExtractedPage`].
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn extract(
        &self,
        url: &str,
        hints: &ExtractionHints,
    ) -> Result<ExtractedPage, ExtractionError>;
}

/// [`PageSource`] backed by a live HTTP fetch.
#[derive(Debug, Clone)]
pub struct WebExtractor {
    fetcher: Fetcher,
}

impl WebExtractor {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageSource for WebExtractor {
    #[instrument(skip(self, hints), fields(content_selector = hints.content_selector.as_deref()))]
    async fn extract(
        &self,
        url: &str,
        hints: &ExtractionHints,
    ) -> Result<ExtractedPage, ExtractionError> {
        let response = self.fetcher.fetch(url).await?;
        let page = extract(&response, hints)?;
        info!(
            final_url = %page.final_url,
            words = page.word_count(),
            language = page.language.as_deref().unwrap_or("unknown"),
            "extracted page"
        );
        Ok(page)
    }
}

/// Turns a fetched page into cleaned article text.
pub fn extract(
    resp: &PageResponse,
    hints: &ExtractionHints,
) -> Result<ExtractedPage, ExtractionError> {
    let clean_html = cleaner::strip_boilerplate(&resp.body_utf8, hints);

    let result = reader::extract(&resp.body_utf8, &clean_html, &resp.url_final, hints)
        .ok_or_else(|| ExtractionError::EmptyContent("no article content found".to_string()))?;

    let text = normalize_whitespace(&result.text);
    reject::check(&text).map_err(|reason| ExtractionError::EmptyContent(reason.to_string()))?;

    Ok(ExtractedPage {
        url: resp.url_requested.clone(),
        final_url: resp.url_final.clone(),
        title: result.title,
        site_name: result.site_name,
        language: language::detect_language(&text),
        text,
        fetched_at: resp.fetched_at,
    })
}
