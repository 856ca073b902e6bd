use axum::{extract::State, http::StatusCode, Json};
use backstage_database::ping;
use chrono::Utc;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database) = match ping(state.db_pool()).await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(error = %error, "health check database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    let body = HealthResponse {
        status: if status.is_success() { "ok" } else { "degraded" }.to_string(),
        database: database.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    (status, Json(body))
}
