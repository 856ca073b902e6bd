use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use backstage_database::{ActivityFilter, Page};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    routes::models::ActivityListResponse,
    util::{current_user, require_admin},
    ApiError, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ActivityQuery {
    /// Only entries by this user id.
    pub user: Option<String>,
    /// Exact action, e.g. `vault.revealed`.
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/activity",
    tag = "Activity",
    security(("bearerAuth" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, description = "Audit log, newest first", body = ActivityListResponse),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityListResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    require_admin(&user)?;

    let filter = ActivityFilter {
        user_public_id: query.user.filter(|id| !id.is_empty()),
        action: query.action.filter(|action| !action.is_empty()),
    };
    let entries = state
        .activity()
        .list(&filter, Page::new(query.limit, query.offset))
        .await?;

    Ok(Json(ActivityListResponse {
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}
