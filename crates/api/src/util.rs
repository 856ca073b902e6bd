use axum::http::{header::AUTHORIZATION, HeaderMap};
use backstage_database::{Session, User};

use crate::{ApiError, AppState};

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}

/// Bearer token to an active user and their live session.
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(User, Session), ApiError> {
    let token = require_bearer(headers)?;
    state.authenticate(&token).await
}

pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("administrator role required"))
    }
}
