#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use docaudit::{
    analysis::{Analyzer, AnalyzerConfig},
    app_state::AppState,
    config::LlmSettings,
    embedding::HashingEmbedder,
    extractor::WebExtractor,
    fetcher::{FetchConfig, Fetcher},
    llm::OpenRouterClient,
    pipeline::AnalysisService,
    repositories::{self, Persistence},
    router,
};

pub const ARTICLE_HTML: &str = include_str!("../src/extractor/tests/fixtures/doc_article.html");

pub async fn test_pool() -> SqlitePool {
    let pool = repositories::connect("sqlite::memory:")
        .await
        .expect("open in-memory db");
    repositories::migrate(&pool).await.expect("run migrations");
    pool
}

pub fn llm_settings(base_url: &str) -> LlmSettings {
    LlmSettings {
        api_key: Some("test-key".to_string()),
        base_url: base_url.to_string(),
        model: "test/model".to_string(),
        max_tokens: 512,
        temperature: 0.2,
        timeout: Duration::from_secs(5),
    }
}

/// Chat completion body carrying `content` as the only choice.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "gen-1",
        "model": "test/model",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

pub fn well_formed_analysis(score: u32) -> String {
    format!(
        "Score: {score}/10\n\n\
         ## Assessment\n\
         The article is clear and walks through each step in order.\n\n\
         ## Flow Issues\n\
         The sender verification step comes late.\n\n\
         ## Improvement Suggestions\n\
         1. Add a screenshot of the dashboard.\n\
         2. Link to the audience segmentation guide.\n"
    )
}

pub async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html.as_bytes().to_vec(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Answers every chat completion with a well-formed analysis.
pub async fn mount_model(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&well_formed_analysis(7))))
        .mount(server)
        .await;
}

pub fn analysis_service(pool: SqlitePool, llm_base_url: &str) -> AnalysisService {
    let fetcher = Fetcher::new(FetchConfig::default().with_timeout(Duration::from_secs(5)))
        .expect("build fetcher");
    let model = OpenRouterClient::new(&llm_settings(llm_base_url)).expect("build model client");
    let analyzer = Analyzer::new(
        Arc::new(model),
        AnalyzerConfig {
            call_timeout: Duration::from_secs(5),
            retry_base_delay: Duration::from_millis(10),
            ..AnalyzerConfig::default()
        },
    );

    AnalysisService::new(
        Arc::new(WebExtractor::new(fetcher)),
        analyzer,
        Arc::new(HashingEmbedder::default()),
        Persistence::sqlite(pool),
    )
}

pub fn test_app(pool: SqlitePool, llm_base_url: &str) -> Router {
    let service = analysis_service(pool.clone(), llm_base_url);
    router::router(AppState::new(service, pool))
}

/// A plain article of roughly `paragraphs * 50` words.
pub fn long_article_html(paragraphs: usize) -> String {
    let paragraph = "Each release of the reporting tool adds small changes that teams notice only \
        after a few weeks of use. Read the notes before you upgrade, check which settings moved, \
        and keep a short list of the reports your team opens every day. When something looks \
        different, compare it with that list first and then ask support.";
    let body: String = (0..paragraphs)
        .map(|i| format!("<p>{paragraph} This is note {i}.</p>\n"))
        .collect();
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><title>Upgrade Notes</title></head>\
         <body><main><article><h1>Upgrade Notes</h1>\n{body}</article></main></body></html>"
    )
}
