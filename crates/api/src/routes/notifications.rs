use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use backstage_database::{NewActivity, NewNotification, NotificationKind, Page};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

use crate::{
    routes::models::{
        BroadcastNotificationRequest, BulkUpdateResponse, NotificationsResponse,
        UnreadCountResponse,
    },
    util::{current_user, require_admin},
    ApiError, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(ListNotificationsQuery),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;

    let notifications = state
        .notifications()
        .list(
            user.id,
            query.unread_only.unwrap_or(false),
            Page::new(query.limit, query.offset),
        )
        .await?;

    Ok(Json(NotificationsResponse {
        notifications: notifications.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Unread notification count", body = UnreadCountResponse)
    )
)]
pub async fn get_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let unread_count = state.notifications().unread_count(user.id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Marked as read"),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    state
        .notifications()
        .mark_read(user.id, &notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Number of notifications marked read", body = BulkUpdateResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let updated = state.notifications().mark_all_read(user.id).await?;
    Ok(Json(BulkUpdateResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    state
        .notifications()
        .delete(user.id, &notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    request_body = BroadcastNotificationRequest,
    responses(
        (status = 200, description = "Number of users notified", body = BulkUpdateResponse),
        (status = 400, description = "Empty title or body", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn broadcast_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BroadcastNotificationRequest>,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    require_admin(&user)?;

    let title = payload.title.trim();
    let body = payload.body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(ApiError::bad_request("title and body are required"));
    }

    let notification = NewNotification {
        kind: payload
            .kind
            .as_deref()
            .map(NotificationKind::from)
            .unwrap_or(NotificationKind::Info),
        title: title.to_string(),
        body: body.to_string(),
        link: payload.link.filter(|link| !link.trim().is_empty()),
    };

    let updated = state
        .notifications()
        .create_for_all_active_users(&notification, None)
        .await?;

    info!(notified = updated, "broadcast notification sent");
    state
        .record_activity(
            NewActivity::new(Some(user.id), "notification.broadcast", "notification")
                .details(json!({ "title": notification.title, "recipients": updated })),
        )
        .await;

    Ok(Json(BulkUpdateResponse { updated }))
}
