use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::analysis::{
    AnalysisFailure, AnalysisResult, DetailSection, Dimension, DimensionOutcome, FailureKind,
};
use crate::app_state::AppState;
use crate::directory::{DimensionEntry, DocumentView, SessionDetail, SessionSummary};
use crate::entities::{Session, SessionStatus};
use crate::export::ExportFormat;
use crate::extractor::ExtractionHints;
use crate::health::{self, HealthResponse};
use crate::scoring::{ReadabilityMetrics, ReadingLevel};
use crate::sessions::dtos::{AnalysisResponse, AnalyzeRequest, ErrorResponse, SessionListResponse};
use crate::sessions::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        handlers::create_analysis,
        handlers::list_sessions,
        handlers::get_session,
        handlers::rerun_dimension,
        handlers::export_session,
    ),
    components(schemas(
        HealthResponse,
        AnalyzeRequest,
        AnalysisResponse,
        SessionListResponse,
        ErrorResponse,
        SessionSummary,
        SessionDetail,
        DocumentView,
        DimensionEntry,
        Session,
        SessionStatus,
        ReadabilityMetrics,
        ReadingLevel,
        Dimension,
        DimensionOutcome,
        AnalysisResult,
        DetailSection,
        AnalysisFailure,
        FailureKind,
        ExportFormat,
        ExtractionHints,
    )),
    tags(
        (name = "analyses", description = "Run documentation analyses"),
        (name = "sessions", description = "Stored analysis sessions"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/v1/analyses", post(handlers::create_analysis))
        .route("/v1/sessions", get(handlers::list_sessions))
        .route("/v1/sessions/{id}", get(handlers::get_session))
        .route(
            "/v1/sessions/{id}/dimensions/{dimension}",
            post(handlers::rerun_dimension),
        )
        .route("/v1/sessions/{id}/export", get(handlers::export_session))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
}
