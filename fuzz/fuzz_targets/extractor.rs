#![no_main]

use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use reqwest::StatusCode;
use url::Url;

use docaudit::extractor::{ExtractionHints, extract};
use docaudit::fetcher::PageResponse;
use docaudit::scoring;

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data).to_string();
    let url = Url::parse("https://docs.example.com/guide").unwrap();

    let response = PageResponse {
        url_requested: url.clone(),
        url_final: url,
        status: StatusCode::OK,
        content_type: "text/html".to_string(),
        charset: "UTF-8",
        body_utf8: html,
        fetched_at: Utc::now(),
    };

    // Neither extraction nor scoring may panic, whatever the markup.
    if let Ok(page) = extract(&response, &ExtractionHints::default()) {
        let _ = scoring::score(&page.text);
    }
});
