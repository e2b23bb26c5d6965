use crate::fetcher::{errors::FetchError, types::PageResponse};
use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use url::Url;

static CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).unwrap());

static META_CHARSET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#).unwrap());

/// Bytes inspected when sniffing `<meta>` declarations.
const SNIFF_LEN: usize = 4096;

pub fn process_response(
    url_requested: Url,
    url_final: Url,
    status: StatusCode,
    content_type: &str,
    body: &[u8],
) -> Result<PageResponse, FetchError> {
    let encoding = detect_encoding(content_type, body);
    let body_utf8 = decode_to_utf8(body, encoding)?;

    Ok(PageResponse {
        url_requested,
        url_final,
        status,
        content_type: content_type.to_string(),
        charset: encoding.name(),
        body_utf8,
        fetched_at: Utc::now(),
    })
}

/// Header charset first, then a `<meta>` declaration in the first few KB,
/// then a statistical guess.
fn detect_encoding(content_type: &str, body: &[u8]) -> &'static Encoding {
    if let Some(encoding) = label_from(&CHARSET_REGEX, content_type) {
        return encoding;
    }

    let head = &body[..body.len().min(SNIFF_LEN)];
    let head_str = String::from_utf8_lossy(head);
    // Also matches http-equiv content="text/html; charset=..."
    if let Some(encoding) = label_from(&META_CHARSET_REGEX, &head_str) {
        return encoding;
    }
    if let Some(encoding) = label_from(&CHARSET_REGEX, &head_str) {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body.len() <= SNIFF_LEN);
    detector.guess(None, true)
}

fn label_from(regex: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = regex.captures(haystack)?.get(1)?.as_str().to_lowercase();
    Encoding::for_label(label.as_bytes())
}

fn decode_to_utf8(body: &[u8], encoding: &'static Encoding) -> Result<String, FetchError> {
    let (decoded, _encoding, had_errors) = encoding.decode(body);

    if had_errors {
        return Err(FetchError::Charset(format!(
            "failed to decode content as {}",
            encoding.name()
        )));
    }

    Ok(decoded.into_owned())
}
