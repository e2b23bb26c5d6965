use docaudit::fetcher::{FetchConfig, FetchError, Fetcher};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn fetcher() -> Fetcher {
    Fetcher::new(FetchConfig::default()).unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    "<html><head><title>Test</title></head><body>Hello World</body></html>"
                        .as_bytes(),
                )
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/test", mock_server.uri());
    let result = fetcher().fetch(&url).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("Hello World"));
    assert_eq!(result.url_final.as_str(), url);
    assert_eq!(result.charset, "UTF-8");
}

#[tokio::test]
async fn test_fetch_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notfound"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/notfound", mock_server.uri());
    match fetcher().fetch(&url).await {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(!retriable);
        }
        other => panic!("expected HTTP 404 error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_500_retryable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let url = format!("{}/error", mock_server.uri());
    match fetcher().fetch(&url).await {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 500);
            assert!(retriable);
        }
        other => panic!("expected HTTP 500 error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/redirect"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/final"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body>Final page</body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/redirect", mock_server.uri());
    let result = fetcher().fetch(&url).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("Final page"));
    assert!(result.url_final.as_str().ends_with("/final"));
    assert!(result.url_requested.as_str().ends_with("/redirect"));
}

#[tokio::test]
async fn test_fetch_redirect_loop_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&mock_server)
        .await;

    let url = format!("{}/loop", mock_server.uri());
    let result = fetcher().fetch(&url).await;

    assert!(matches!(result, Err(FetchError::RedirectRejected(_))), "{result:?}");
}

#[tokio::test]
async fn test_fetch_off_host_redirect_rejected() {
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();

    // Same server, but "localhost" is a different host from "127.0.0.1".
    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("http://localhost:{port}/final").as_str()),
        )
        .mount(&mock_server)
        .await;

    let config = FetchConfig {
        max_off_host_redirects: 0,
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(config).unwrap();
    let url = format!("http://127.0.0.1:{port}/away");
    let result = fetcher.fetch(&url).await;

    assert!(matches!(result, Err(FetchError::RedirectRejected(_))), "{result:?}");
}

#[tokio::test]
async fn test_fetch_follows_redirects_within_new_host() {
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();

    // 127.0.0.1 -> localhost, then a same-host hop on localhost.
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("http://localhost:{port}/step").as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/step"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/final"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body>Moved here</body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("http://127.0.0.1:{port}/start");
    let result = fetcher().fetch(&url).await.unwrap();

    assert!(result.body_utf8.contains("Moved here"));
    assert_eq!(result.url_final.host_str(), Some("localhost"));
    assert_eq!(result.url_final.path(), "/final");
}

#[tokio::test]
async fn test_fetch_second_host_change_rejected() {
    let mock_server = MockServer::start().await;
    let port = mock_server.address().port();

    // 127.0.0.1 -> localhost -> 127.0.0.1 changes host twice.
    Mock::given(method("GET"))
        .and(path("/out"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://localhost:{port}/back").as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/back"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://127.0.0.1:{port}/home").as_str()),
        )
        .mount(&mock_server)
        .await;

    let url = format!("http://127.0.0.1:{port}/out");
    let result = fetcher().fetch(&url).await;

    assert!(matches!(result, Err(FetchError::RedirectRejected(_))), "{result:?}");
}

#[tokio::test]
async fn test_fetch_gzip_compression() {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let original_content =
        "<html><head><title>Compressed</title></head><body>This content is gzipped!</body></html>";

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(original_content.as_bytes()).unwrap();
    let compressed_data = encoder.finish().unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gzipped"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(compressed_data)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .insert_header("Content-Encoding", "gzip"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/gzipped", mock_server.uri());
    let result = fetcher().fetch(&url).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body_utf8.contains("This content is gzipped!"));
}

#[tokio::test]
async fn test_fetch_legacy_charset() {
    let mock_server = MockServer::start().await;

    // "café" in windows-1252
    let body = b"<html><body>caf\xe9</body></html>".to_vec();
    Mock::given(method("GET"))
        .and(path("/latin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "text/html; charset=windows-1252"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/latin", mock_server.uri());
    let result = fetcher().fetch(&url).await.unwrap();

    assert!(result.body_utf8.contains("café"));
}

#[tokio::test]
async fn test_fetch_unsupported_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF])
                .insert_header("Content-Type", "image/jpeg"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/image", mock_server.uri());
    match fetcher().fetch(&url).await {
        Err(FetchError::UnsupportedContentType(content_type)) => {
            assert_eq!(content_type, "image/jpeg");
        }
        other => panic!("expected UnsupportedContentType error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_body_too_large() {
    let mock_server = MockServer::start().await;

    let large_body = "x".repeat(6 * 1024 * 1024);

    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(large_body.as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/large", mock_server.uri());
    match fetcher().fetch(&url).await {
        Err(FetchError::BodyTooLarge(size)) => {
            assert_eq!(size, 6 * 1024 * 1024);
        }
        other => panic!("expected BodyTooLarge error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_invalid_url() {
    match fetcher().fetch("not-a-valid-url").await {
        Err(FetchError::InvalidUrl(_)) => {}
        other => panic!("expected InvalidUrl error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_unsupported_scheme() {
    match fetcher().fetch("ftp://example.com/file").await {
        Err(FetchError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "ftp"),
        other => panic!("expected UnsupportedScheme error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_unreachable_host() {
    // Bind then drop a listener so the port is closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = fetcher().fetch(&format!("http://127.0.0.1:{port}/")).await;
    assert!(matches!(result, Err(FetchError::Unreachable(_))), "{result:?}");
}

#[tokio::test]
async fn test_error_retry_classification() {
    assert!(!FetchError::InvalidUrl(url::ParseError::EmptyHost).should_retry());
    assert!(!FetchError::BodyTooLarge(1000).should_retry());
    assert!(!FetchError::UnsupportedContentType("image/png".to_string()).should_retry());
    assert!(!FetchError::Charset("Invalid encoding".to_string()).should_retry());
    assert!(!FetchError::RedirectRejected("loop".to_string()).should_retry());

    assert!(FetchError::Unreachable("DNS failure".to_string()).should_retry());
    assert!(FetchError::ConnectTimeout.should_retry());
    assert!(FetchError::RequestTimeout.should_retry());

    assert!(
        !FetchError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            retriable: false
        }
        .should_retry()
    );
    assert!(
        FetchError::Http {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            retriable: true
        }
        .should_retry()
    );
}
