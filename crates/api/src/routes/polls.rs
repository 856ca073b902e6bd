use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use backstage_database::{NewActivity, NewNotification, NewPoll, NotificationKind, Poll};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use utoipa::IntoParams;

use crate::{
    routes::models::{CreatePollRequest, PollResponse, PollsResponse, VoteRequest},
    util::{current_user, require_admin},
    ApiError, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPollsQuery {
    /// Include closed and expired polls.
    pub include_closed: Option<bool>,
}

async fn load_poll(state: &AppState, poll_id: &str) -> Result<Poll, ApiError> {
    state
        .polls()
        .find_by_public_id(poll_id)
        .await?
        .ok_or_else(|| ApiError::not_found("poll not found"))
}

#[utoipa::path(
    get,
    path = "/api/polls",
    tag = "Polls",
    security(("bearerAuth" = [])),
    params(ListPollsQuery),
    responses(
        (status = 200, description = "Polls with tallies and the caller's vote", body = PollsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_polls(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListPollsQuery>,
) -> Result<Json<PollsResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;

    let summaries = state
        .polls()
        .list_summaries(user.id, query.include_closed.unwrap_or(true))
        .await?;

    Ok(Json(PollsResponse {
        polls: summaries.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/polls",
    tag = "Polls",
    security(("bearerAuth" = [])),
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Poll created and staff notified", body = PollResponse),
        (status = 400, description = "Invalid poll", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<PollResponse>), ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    require_admin(&user)?;

    let poll = state
        .polls()
        .create(NewPoll {
            question: payload.question,
            description: payload
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            options: payload.options,
            expires_at: payload.expires_at,
            created_by: user.id,
        })
        .await?;

    let notification = NewNotification {
        kind: NotificationKind::Poll,
        title: "New poll".to_string(),
        body: poll.question.clone(),
        link: Some(format!("/polls/{}", poll.public_id)),
    };
    match state
        .notifications()
        .create_for_all_active_users(&notification, Some(user.id))
        .await
    {
        Ok(notified) => info!(poll = %poll.public_id, notified, "poll created"),
        Err(error) => warn!(%error, poll = %poll.public_id, "failed to notify staff about poll"),
    }

    state
        .record_activity(
            NewActivity::new(Some(user.id), "poll.created", "poll")
                .entity(poll.public_id.clone())
                .details(json!({ "question": poll.question })),
        )
        .await;

    let summary = state.polls().summary(poll, user.id).await?;
    Ok((StatusCode::CREATED, Json(summary.into())))
}

#[utoipa::path(
    get,
    path = "/api/polls/{id}",
    tag = "Polls",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Poll id")),
    responses(
        (status = 200, description = "Poll with results", body = PollResponse),
        (status = 404, description = "Poll not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<String>,
) -> Result<Json<PollResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let poll = load_poll(&state, &poll_id).await?;

    let summary = state.polls().summary(poll, user.id).await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    post,
    path = "/api/polls/{id}/vote",
    tag = "Polls",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Poll id")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded, updated results", body = PollResponse),
        (status = 400, description = "Option does not belong to the poll", body = crate::error::ErrorResponse),
        (status = 404, description = "Poll not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already voted or poll closed", body = crate::error::ErrorResponse)
    )
)]
pub async fn vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<PollResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;

    let poll = state
        .polls()
        .cast_vote(&poll_id, &payload.option_id, user.id)
        .await?;

    state
        .record_activity(
            NewActivity::new(Some(user.id), "poll.voted", "poll")
                .entity(poll.public_id.clone())
                .details(json!({ "option_id": payload.option_id })),
        )
        .await;

    let summary = state.polls().summary(poll, user.id).await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    post,
    path = "/api/polls/{id}/close",
    tag = "Polls",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Poll id")),
    responses(
        (status = 200, description = "Poll closed", body = PollResponse),
        (status = 403, description = "Only the creator or an administrator may close a poll", body = crate::error::ErrorResponse),
        (status = 404, description = "Poll not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn close_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<String>,
) -> Result<Json<PollResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let poll = load_poll(&state, &poll_id).await?;

    if !user.role.is_admin() && poll.created_by != user.id {
        return Err(ApiError::forbidden(
            "only the creator or an administrator may close this poll",
        ));
    }

    state.polls().close(poll.id).await?;
    state
        .record_activity(
            NewActivity::new(Some(user.id), "poll.closed", "poll").entity(poll.public_id.clone()),
        )
        .await;

    let closed = load_poll(&state, &poll_id).await?;
    let summary = state.polls().summary(closed, user.id).await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    delete,
    path = "/api/polls/{id}",
    tag = "Polls",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Poll id")),
    responses(
        (status = 204, description = "Poll deleted with its votes"),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse),
        (status = 404, description = "Poll not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_poll(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(poll_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    require_admin(&user)?;

    let poll = load_poll(&state, &poll_id).await?;
    state.polls().delete(poll.id).await?;

    state
        .record_activity(
            NewActivity::new(Some(user.id), "poll.deleted", "poll")
                .entity(poll.public_id)
                .details(json!({ "question": poll.question })),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
