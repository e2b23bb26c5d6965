use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::app_state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    database: String,
    sessions: u64,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse),
        (status = 503, description = "Service unavailable")
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    if let Err(err) = check_database_health(&state.db_pool).await {
        error!(error = %err, "Database health check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let sessions = state
        .service
        .persistence()
        .sessions()
        .count_sessions()
        .await
        .map_err(|err| {
            error!(error = %err, "Session count failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    debug!(sessions, "Health check passed");
    Ok(Json(HealthResponse {
        status: "OK".to_string(),
        database: "healthy".to_string(),
        sessions,
    }))
}

async fn check_database_health(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
