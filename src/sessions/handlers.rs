use std::future::Future;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use uuid::Uuid;

use super::dtos::{
    AnalysisResponse, AnalyzeRequest, DEFAULT_LIST_LIMIT, ErrorResponse, ExportQuery, ListQuery,
    SessionListResponse,
};
use crate::analysis::Dimension;
use crate::app_state::AppState;
use crate::directory::SessionDetail;
use crate::entities::SessionId;
use crate::export;
use crate::pipeline::{AnalyzeOptions, PipelineError};
use crate::repositories::PersistenceError;

#[utoipa::path(
    post,
    path = "/v1/analyses",
    tag = "analyses",
    request_body = AnalyzeRequest,
    responses(
        (status = 201, description = "Analysis stored", body = AnalysisResponse),
        (status = 200, description = "Completed session reused", body = AnalysisResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 422, description = "Page could not be extracted", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn create_analysis(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Response {
    if let Err(error) = payload.validate() {
        return error_response(StatusCode::BAD_REQUEST, error, None);
    }

    let service = state.service.clone();
    let url = payload.url.trim().to_string();
    let options = AnalyzeOptions {
        force: payload.force,
        hints: payload.hints.unwrap_or_default(),
    };
    let result = cancel_on_disconnect(move |cancel| async move {
        service.analyze(&url, options, &cancel).await
    })
    .await;

    match result {
        Ok(outcome) => {
            let status = if outcome.reused {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (
                status,
                Json(AnalysisResponse {
                    reused: outcome.reused,
                    session: outcome.detail,
                }),
            )
                .into_response()
        }
        Err(response) => response,
    }
}

#[utoipa::path(
    get,
    path = "/v1/sessions",
    tag = "sessions",
    params(ListQuery),
    responses(
        (status = 200, description = "Sessions, most recent first", body = SessionListResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
pub async fn list_sessions(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    match state.service.directory().list_sessions(limit).await {
        Ok(sessions) => Json(SessionListResponse { sessions }).into_response(),
        Err(err) => persistence_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session detail", body = SessionDetail),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match load_detail(&state, SessionId::from(id)).await {
        Ok(detail) => Json(detail).into_response(),
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/dimensions/{dimension}",
    tag = "sessions",
    params(
        ("id" = Uuid, Path, description = "Session id"),
        ("dimension" = String, Path, description = "readability, structure, completeness or style")
    ),
    responses(
        (status = 200, description = "Dimension re-run and stored", body = SessionDetail),
        (status = 400, description = "Unknown dimension", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn rerun_dimension(
    State(state): State<AppState>,
    Path((id, dimension)): Path<(Uuid, String)>,
) -> Response {
    let dimension: Dimension = match dimension.parse() {
        Ok(dimension) => dimension,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string(), None),
    };

    let service = state.service.clone();
    let session_id = SessionId::from(id);
    let result = cancel_on_disconnect(move |cancel| async move {
        service.rerun_dimension(session_id, dimension, &cancel).await
    })
    .await;

    match result {
        Ok(detail) => Json(detail).into_response(),
        Err(response) => response,
    }
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/export",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session id"), ExportQuery),
    responses(
        (status = 200, description = "Session report", content(
            (String = "application/json"),
            (String = "text/plain"),
            (String = "text/markdown")
        )),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let detail = match load_detail(&state, SessionId::from(id)).await {
        Ok(detail) => detail,
        Err(response) => return response,
    };

    let format = query.format.unwrap_or_default();
    match export::render(&detail, format) {
        Ok(body) => ([(header::CONTENT_TYPE, format.content_type())], body).into_response(),
        Err(err) => {
            error!(error = %err, "failed to render export");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to render report", None)
        }
    }
}

async fn load_detail(state: &AppState, id: SessionId) -> Result<SessionDetail, Response> {
    match state.service.directory().get_session(id).await {
        Ok(Some(detail)) => Ok(detail),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("session {id} not found"),
            None,
        )),
        Err(err) => Err(persistence_error(err)),
    }
}

/// Runs `work` on its own task with a token that is cancelled if the
/// request future is dropped, so the pipeline can record the cancellation.
async fn cancel_on_disconnect<F, Fut, T>(work: F) -> Result<T, Response>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match tokio::spawn(work(cancel)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(pipeline_error(err)),
        Err(join_err) => {
            error!(error = %join_err, "analysis task failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "analysis failed unexpectedly",
                None,
            ))
        }
    }
}

fn pipeline_error(err: PipelineError) -> Response {
    match err {
        PipelineError::Extraction(e) => {
            warn!(error = %e, "extraction failed");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), Some(e.code()))
        }
        PipelineError::InsufficientText(e) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), Some("insufficient_text"))
        }
        PipelineError::Persistence(e) => persistence_error(e),
        PipelineError::Cancelled => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "analysis cancelled", Some("cancelled"))
        }
        PipelineError::SessionNotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("session {id} not found"), None)
        }
        err @ PipelineError::DocumentMissing(_) => {
            error_response(StatusCode::CONFLICT, err.to_string(), Some("document_missing"))
        }
    }
}

fn persistence_error(err: PersistenceError) -> Response {
    error!(error = %err, "persistence failure");
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "storage unavailable",
        Some("persistence"),
    )
}

fn error_response(status: StatusCode, error: impl Into<String>, code: Option<&str>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.map(str::to_string),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analyzer, AnalyzerConfig};
    use crate::embedding::HashingEmbedder;
    use crate::extractor::{ExtractedPage, ExtractionError, ExtractionHints, PageSource};
    use crate::entities::SessionStatus;
    use crate::llm::{CompletionRequest, LanguageModel, LlmError, MockLanguageModel};
    use crate::pipeline::AnalysisService;
    use crate::repositories::{Persistence, test_pool};
    use crate::router::router;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::Request,
    };
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use url::Url;

    const GOOD: &str =
        "Score: 7/10\n\n## Assessment\nReadable.\n\n## Improvement Suggestions\n1. Add headings.\n";

    struct FixedPage;

    #[async_trait]
    impl PageSource for FixedPage {
        async fn extract(
            &self,
            url: &str,
            _hints: &ExtractionHints,
        ) -> Result<ExtractedPage, ExtractionError> {
            if url.contains("unreachable") {
                return Err(ExtractionError::UnreachableHost("connection refused".into()));
            }
            let url = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(e.to_string()))?;
            Ok(ExtractedPage {
                url: url.clone(),
                final_url: url,
                title: "Setup guide".to_string(),
                site_name: None,
                language: Some("en".to_string()),
                text: "Open the settings page. Choose a channel. Save your changes. ".repeat(10),
                fetched_at: Utc::now(),
            })
        }
    }

    async fn create_test_app(model: MockLanguageModel) -> Router {
        let pool = test_pool().await;
        let service = AnalysisService::new(
            Arc::new(FixedPage),
            Analyzer::new(Arc::new(model), AnalyzerConfig::default()),
            Arc::new(HashingEmbedder::default()),
            Persistence::sqlite(pool.clone()),
        );
        router(AppState::new(service, pool))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_analysis_then_fetch_and_export() {
        let mut model = MockLanguageModel::new();
        model.expect_complete().times(4).returning(|_| Ok(GOOD.to_string()));
        let app = create_test_app(model).await;

        let response = app
            .clone()
            .oneshot(post_json("/v1/analyses", r#"{"url":"https://docs.example.com/setup"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["reused"], false);
        assert_eq!(body["session"]["session"]["status"], "completed");
        let id = body["session"]["session"]["id"].as_str().unwrap().to_string();

        let response = app.clone().oneshot(get(&format!("/v1/sessions/{id}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["results"].as_array().unwrap().len(), 4);

        let response = app.clone().oneshot(get("/v1/sessions?limit=5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["sessions"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(get(&format!("/v1/sessions/{id}/export?format=text")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        // A second request for the same URL reuses the stored session
        let response = app
            .oneshot(post_json("/v1/analyses", r#"{"url":"https://docs.example.com/setup"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["reused"], true);
    }

    struct StallOnStyle;

    #[async_trait]
    impl LanguageModel for StallOnStyle {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            if request.prompt.contains("Microsoft") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok(GOOD.to_string())
        }
    }

    #[tokio::test]
    async fn test_dropped_guard_cancels_spawned_work() {
        let (observed_tx, observed_rx) = tokio::sync::oneshot::channel();
        let request = cancel_on_disconnect(move |cancel| async move {
            cancel.cancelled().await;
            let _ = observed_tx.send(());
            Err::<(), _>(PipelineError::Cancelled)
        });

        // The timeout drops the request future once it elapses
        assert!(tokio::time::timeout(Duration::from_millis(50), request).await.is_err());
        tokio::time::timeout(Duration::from_secs(2), observed_rx)
            .await
            .expect("spawned work saw the cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn test_client_disconnect_cancels_analysis() {
        let pool = test_pool().await;
        let service = AnalysisService::new(
            Arc::new(FixedPage),
            Analyzer::new(Arc::new(StallOnStyle), AnalyzerConfig::default()),
            Arc::new(HashingEmbedder::default()),
            Persistence::sqlite(pool.clone()),
        );
        let app = router(AppState::new(service.clone(), pool));

        let request = app.oneshot(post_json("/v1/analyses", r#"{"url":"https://docs.example.com/slow"}"#));
        assert!(tokio::time::timeout(Duration::from_millis(300), request).await.is_err());

        let mut status = None;
        for _ in 0..50 {
            let sessions = service.persistence().sessions().list_sessions(1).await.unwrap();
            status = sessions.first().map(|s| s.status);
            if status == Some(SessionStatus::Cancelled) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, Some(SessionStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_unprocessable() {
        let app = create_test_app(MockLanguageModel::new()).await;

        let response = app
            .clone()
            .oneshot(post_json("/v1/analyses", r#"{"url":"https://unreachable.example"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "unreachable_host");

        let response = app.oneshot(get("/v1/sessions")).await.unwrap();
        assert!(json_body(response).await["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_empty_url() {
        let app = create_test_app(MockLanguageModel::new()).await;
        let response = app
            .oneshot(post_json("/v1/analyses", r#"{"url":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_and_dimension() {
        let app = create_test_app(MockLanguageModel::new()).await;
        let id = Uuid::new_v4();

        let response = app.clone().oneshot(get(&format!("/v1/sessions/{id}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(post_json(&format!("/v1/sessions/{id}/dimensions/tone"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json(&format!("/v1/sessions/{id}/dimensions/style"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_openapi() {
        let app = create_test_app(MockLanguageModel::new()).await;

        let response = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["database"], "healthy");

        let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json_body(response).await;
        assert!(doc["paths"]["/v1/analyses"]["post"].is_object());
    }
}
