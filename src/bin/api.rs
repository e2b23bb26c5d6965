use std::sync::Arc;

use anyhow::{Context, Result};
use docaudit::{
    analysis::{Analyzer, AnalyzerConfig},
    app_state::AppState,
    config::Config,
    embedding,
    extractor::WebExtractor,
    fetcher::{FetchConfig, Fetcher},
    llm::OpenRouterClient,
    pipeline::AnalysisService,
    repositories::{self, Persistence},
    router::router,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let pool = repositories::connect(config.database_url())
        .await
        .with_context(|| format!("failed to open {}", config.database_url()))?;
    repositories::migrate(&pool).await?;

    let fetcher = Fetcher::new(FetchConfig::default().with_timeout(config.fetch_timeout()))?;
    let model = OpenRouterClient::new(config.llm())?;
    if config.llm().api_key.is_none() {
        warn!("no LLM API key configured; every dimension will be reported unavailable");
    }
    let embedder = embedding::from_settings(config.embedding(), config.llm().api_key.clone())?;

    let service = AnalysisService::new(
        Arc::new(WebExtractor::new(fetcher)),
        Analyzer::new(Arc::new(model), AnalyzerConfig::from(config.llm())),
        Arc::from(embedder),
        Persistence::sqlite(pool.clone()),
    );
    let app = router(AppState::new(service, pool));

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(
        addr = config.bind_addr(),
        model = %config.llm().model,
        "docaudit api listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docaudit=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
