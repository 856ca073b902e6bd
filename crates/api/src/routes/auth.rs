use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use backstage_auth::{AuthError, AuthSession};
use backstage_database::NewActivity;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::{routes::models::UserResponse, util::current_user, ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Required when the station has a secure word configured.
    #[serde(default)]
    pub secure_word: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

impl From<AuthSession> for SessionResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
            user: session.user.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "Account disabled", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let result = state
        .authenticator()
        .login(
            &payload.username,
            &payload.password,
            payload.secure_word.as_deref(),
        )
        .await;

    match result {
        Ok(session) => {
            state
                .record_activity(
                    NewActivity::new(Some(session.user.id), "auth.login", "session")
                        .entity(session.session_id.clone()),
                )
                .await;
            Ok(Json(session.into()))
        }
        Err(error) => {
            if matches!(
                error,
                AuthError::InvalidCredentials | AuthError::TooManyAttempts { .. }
            ) {
                state
                    .record_activity(
                        NewActivity::new(None, "auth.login_failed", "session")
                            .details(json!({ "username": payload.username.trim() })),
                    )
                    .await;
            }
            Err(error.into())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let (user, session) = current_user(&state, &headers).await?;

    state.authenticator().logout(&session.id).await?;
    state
        .record_activity(NewActivity::new(Some(user.id), "auth.logout", "session").entity(session.id))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = ProfileResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    Ok(Json(ProfileResponse { user: user.into() }))
}

#[utoipa::path(
    post,
    path = "/api/auth/password",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Password does not meet the policy", body = crate::error::ErrorResponse),
        (status = 401, description = "Current password is wrong", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;

    state
        .authenticator()
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    info!(user = %user.public_id, "password changed via api");
    state
        .record_activity(
            NewActivity::new(Some(user.id), "auth.password_changed", "user")
                .entity(user.public_id.clone()),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
