use axum::{extract::State, http::HeaderMap, Json};
use backstage_analytics::{read_report, AnalyticsReport};
use backstage_azuracast::{Listeners, LiveStatus, SongPlay};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{util::current_user, ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct LiveStatsResponse {
    pub is_online: bool,
    pub listeners: Listeners,
    pub live: LiveStatus,
    pub current_song: Option<SongPlay>,
    pub checked_at: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/api/analytics/report",
    tag = "Analytics",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Pre-computed listener report", body = AnalyticsReport),
        (status = 404, description = "Report not generated yet", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_report(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsReport>, ApiError> {
    current_user(&state, &headers).await?;
    let report = read_report(state.report_path()).await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/analytics/live",
    tag = "Analytics",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current listener numbers", body = LiveStatsResponse),
        (status = 503, description = "AzuraCast not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_live_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LiveStatsResponse>, ApiError> {
    current_user(&state, &headers).await?;
    let now_playing = state.azuracast().now_playing().await?;

    Ok(Json(LiveStatsResponse {
        is_online: now_playing.is_online,
        listeners: now_playing.listeners,
        live: now_playing.live,
        current_song: now_playing.current_song,
        checked_at: Utc::now(),
    }))
}
