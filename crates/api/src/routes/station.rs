use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use backstage_azuracast::{Broadcast, NowPlaying, ScheduleEvent, ScheduleItem, Streamer};
use backstage_database::{NewActivity, User};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{util::current_user, ApiError, AppState};

const DEFAULT_SCHEDULE_DAYS: i64 = 7;
const MAX_SCHEDULE_DAYS: i64 = 62;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ScheduleQuery {
    /// Defaults to now.
    pub start: Option<DateTime<Utc>>,
    /// Defaults to a week after `start`.
    pub end: Option<DateTime<Utc>>,
}

impl ScheduleQuery {
    fn range(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let start = self.start.unwrap_or(now);
        let end = match self.end {
            Some(end) => end,
            None => start
                .checked_add_signed(Duration::days(DEFAULT_SCHEDULE_DAYS))
                .ok_or_else(|| ApiError::bad_request("start is out of range"))?,
        };

        if end <= start {
            return Err(ApiError::bad_request("end must be after start"));
        }
        if end - start > Duration::days(MAX_SCHEDULE_DAYS) {
            return Err(ApiError::bad_request(format!(
                "schedule range is limited to {MAX_SCHEDULE_DAYS} days"
            )));
        }
        Ok((start, end))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StreamersResponse {
    pub streamers: Vec<Streamer>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CalendarResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub events: Vec<ScheduleEvent>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleItemsResponse {
    pub streamer_id: i64,
    pub items: Vec<ScheduleItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BroadcastsResponse {
    pub broadcasts: Vec<Broadcast>,
}

fn ensure_can_manage(user: &User, streamer_id: i64) -> Result<(), ApiError> {
    if user.can_manage_streamer(streamer_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "you can only manage your own streamer account",
        ))
    }
}

async fn record_schedule_change(
    state: &AppState,
    user: &User,
    action: &str,
    streamer_id: i64,
    details: serde_json::Value,
) {
    state
        .record_activity(
            NewActivity::new(Some(user.id), action, "streamer_schedule")
                .entity(streamer_id.to_string())
                .details(details),
        )
        .await;
}

#[utoipa::path(
    get,
    path = "/api/station/now-playing",
    tag = "Station",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "What is on air", body = NowPlaying),
        (status = 502, description = "AzuraCast request failed", body = crate::error::ErrorResponse),
        (status = 503, description = "AzuraCast not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn now_playing(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NowPlaying>, ApiError> {
    current_user(&state, &headers).await?;
    Ok(Json(state.azuracast().now_playing().await?))
}

#[utoipa::path(
    get,
    path = "/api/station/streamers",
    tag = "Station",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Streamer accounts", body = StreamersResponse)
    )
)]
pub async fn list_streamers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StreamersResponse>, ApiError> {
    current_user(&state, &headers).await?;
    let streamers = state.azuracast().streamers().await?;
    Ok(Json(StreamersResponse { streamers }))
}

#[utoipa::path(
    get,
    path = "/api/station/schedule",
    tag = "Station",
    security(("bearerAuth" = [])),
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Streamer calendar", body = CalendarResponse),
        (status = 400, description = "Invalid range", body = crate::error::ErrorResponse)
    )
)]
pub async fn calendar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<CalendarResponse>, ApiError> {
    current_user(&state, &headers).await?;
    let (start, end) = query.range(Utc::now())?;

    let events = state.azuracast().schedule(start, end).await?;
    Ok(Json(CalendarResponse { start, end, events }))
}

#[utoipa::path(
    get,
    path = "/api/station/streamers/{id}/schedule",
    tag = "Station",
    security(("bearerAuth" = [])),
    params(("id" = i64, Path, description = "AzuraCast streamer id")),
    responses(
        (status = 200, description = "Recurring schedule slots", body = ScheduleItemsResponse),
        (status = 403, description = "Not your streamer account", body = crate::error::ErrorResponse),
        (status = 404, description = "Streamer not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_streamer_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(streamer_id): Path<i64>,
) -> Result<Json<ScheduleItemsResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    ensure_can_manage(&user, streamer_id)?;

    let streamer = state.azuracast().streamer(streamer_id).await?;
    Ok(Json(ScheduleItemsResponse {
        streamer_id,
        items: streamer.schedule_items,
    }))
}

#[utoipa::path(
    post,
    path = "/api/station/streamers/{id}/schedule",
    tag = "Station",
    security(("bearerAuth" = [])),
    params(("id" = i64, Path, description = "AzuraCast streamer id")),
    request_body = ScheduleItem,
    responses(
        (status = 201, description = "Slot added, full schedule returned", body = ScheduleItemsResponse),
        (status = 400, description = "Invalid slot", body = crate::error::ErrorResponse),
        (status = 403, description = "Not your streamer account", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_schedule_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(streamer_id): Path<i64>,
    Json(item): Json<ScheduleItem>,
) -> Result<(StatusCode, Json<ScheduleItemsResponse>), ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    ensure_can_manage(&user, streamer_id)?;

    let summary = json!({ "time": item.time_range(), "days": item.days });
    let items = state
        .azuracast()
        .add_schedule_item(streamer_id, item)
        .await?;
    record_schedule_change(&state, &user, "schedule.added", streamer_id, summary).await;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleItemsResponse { streamer_id, items }),
    ))
}

#[utoipa::path(
    put,
    path = "/api/station/streamers/{id}/schedule/{item_id}",
    tag = "Station",
    security(("bearerAuth" = [])),
    params(
        ("id" = i64, Path, description = "AzuraCast streamer id"),
        ("item_id" = i64, Path, description = "Schedule slot id")
    ),
    request_body = ScheduleItem,
    responses(
        (status = 200, description = "Slot replaced, full schedule returned", body = ScheduleItemsResponse),
        (status = 400, description = "Invalid slot", body = crate::error::ErrorResponse),
        (status = 403, description = "Not your streamer account", body = crate::error::ErrorResponse),
        (status = 404, description = "Slot not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn replace_schedule_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((streamer_id, item_id)): Path<(i64, i64)>,
    Json(item): Json<ScheduleItem>,
) -> Result<Json<ScheduleItemsResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    ensure_can_manage(&user, streamer_id)?;

    let summary = json!({ "item_id": item_id, "time": item.time_range(), "days": item.days });
    let items = state
        .azuracast()
        .replace_schedule_item(streamer_id, item_id, item)
        .await?;
    record_schedule_change(&state, &user, "schedule.updated", streamer_id, summary).await;

    Ok(Json(ScheduleItemsResponse { streamer_id, items }))
}

#[utoipa::path(
    delete,
    path = "/api/station/streamers/{id}/schedule/{item_id}",
    tag = "Station",
    security(("bearerAuth" = [])),
    params(
        ("id" = i64, Path, description = "AzuraCast streamer id"),
        ("item_id" = i64, Path, description = "Schedule slot id")
    ),
    responses(
        (status = 200, description = "Slot removed, remaining schedule returned", body = ScheduleItemsResponse),
        (status = 403, description = "Not your streamer account", body = crate::error::ErrorResponse),
        (status = 404, description = "Slot not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_schedule_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((streamer_id, item_id)): Path<(i64, i64)>,
) -> Result<Json<ScheduleItemsResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    ensure_can_manage(&user, streamer_id)?;

    let items = state
        .azuracast()
        .remove_schedule_item(streamer_id, item_id)
        .await?;
    record_schedule_change(
        &state,
        &user,
        "schedule.removed",
        streamer_id,
        json!({ "item_id": item_id }),
    )
    .await;

    Ok(Json(ScheduleItemsResponse { streamer_id, items }))
}

#[utoipa::path(
    get,
    path = "/api/station/streamers/{id}/broadcasts",
    tag = "Station",
    security(("bearerAuth" = [])),
    params(("id" = i64, Path, description = "AzuraCast streamer id")),
    responses(
        (status = 200, description = "Past live broadcasts", body = BroadcastsResponse),
        (status = 403, description = "Not your streamer account", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_broadcasts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(streamer_id): Path<i64>,
) -> Result<Json<BroadcastsResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    ensure_can_manage(&user, streamer_id)?;

    let broadcasts = state.azuracast().broadcasts(streamer_id).await?;
    Ok(Json(BroadcastsResponse { broadcasts }))
}
