use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use backstage_auth::{password::validate_email, RegisterUser};
use backstage_database::{NewActivity, UserRole, UserUpdate};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{
    routes::models::{double_option, UserResponse, UsersResponse},
    util::{current_user, require_admin},
    ApiError, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Admins only; ignored for everyone else.
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    #[serde(default)]
    pub azuracast_streamer_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub azuracast_streamer_id: Option<Option<i64>>,
}

impl UpdateUserRequest {
    fn into_update(self) -> Result<UserUpdate, ApiError> {
        let display_name = match self.display_name {
            Some(name) if name.trim().is_empty() => {
                return Err(ApiError::bad_request("display name must not be empty"))
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };

        let email = match self.email {
            Some(Some(email)) if !email.trim().is_empty() => {
                let email = email.trim().to_string();
                validate_email(&email).map_err(ApiError::bad_request)?;
                Some(Some(email))
            }
            Some(_) => Some(None),
            None => None,
        };

        let role = self
            .role
            .as_deref()
            .map(str::parse::<UserRole>)
            .transpose()
            .map_err(ApiError::bad_request)?;

        Ok(UserUpdate {
            display_name,
            email,
            role,
            is_active: self.is_active,
            azuracast_streamer_id: self.azuracast_streamer_id,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Staff directory", body = UsersResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let include_inactive = user.role.is_admin() && query.include_inactive.unwrap_or(false);

    let users = state.users().list(include_inactive).await?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid user payload", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse),
        (status = 409, description = "Username already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let (admin, _) = current_user(&state, &headers).await?;
    require_admin(&admin)?;

    let role: UserRole = payload.role.parse().map_err(ApiError::bad_request)?;
    let created = state
        .authenticator()
        .register_user(RegisterUser {
            username: payload.username,
            password: payload.password,
            display_name: payload.display_name,
            email: payload.email,
            role,
            azuracast_streamer_id: payload.azuracast_streamer_id,
        })
        .await?;

    state
        .record_activity(
            NewActivity::new(Some(admin.id), "user.created", "user")
                .entity(created.public_id.clone())
                .details(json!({ "username": created.username, "role": created.role })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid update", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Would remove the last active administrator", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let (admin, _) = current_user(&state, &headers).await?;
    require_admin(&admin)?;

    let target = state
        .users()
        .find_by_public_id(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let update = payload.into_update()?;

    let deactivated = update.is_active == Some(false);

    let updated = state.users().update(target.id, &update).await?;

    if deactivated && target.is_active {
        state.authenticator().logout_all(target.id).await?;
    }

    state
        .record_activity(
            NewActivity::new(Some(admin.id), "user.updated", "user")
                .entity(updated.public_id.clone())
                .details(json!({
                    "role": updated.role,
                    "is_active": updated.is_active,
                    "azuracast_streamer_id": updated.azuracast_streamer_id,
                })),
        )
        .await;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/password",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password reset and sessions revoked"),
        (status = 400, description = "Password does not meet the policy", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator role required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let (admin, _) = current_user(&state, &headers).await?;
    require_admin(&admin)?;

    let target = state
        .users()
        .find_by_public_id(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    state
        .authenticator()
        .reset_password(target.id, &payload.new_password)
        .await?;

    state
        .record_activity(
            NewActivity::new(Some(admin.id), "user.password_reset", "user")
                .entity(target.public_id),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_parses_role_and_clears_email() {
        let request: UpdateUserRequest =
            serde_json::from_str(r#"{"role": "DJ", "email": null, "azuracast_streamer_id": 4}"#)
                .unwrap();
        let update = request.into_update().unwrap();

        assert_eq!(update.role, Some(UserRole::Dj));
        assert_eq!(update.email, Some(None));
        assert_eq!(update.azuracast_streamer_id, Some(Some(4)));
        assert!(update.display_name.is_none());
    }

    #[test]
    fn update_request_rejects_unknown_role_and_blank_name() {
        let bad_role = UpdateUserRequest {
            role: Some("producer".into()),
            ..Default::default()
        };
        assert!(bad_role.into_update().is_err());

        let blank = UpdateUserRequest {
            display_name: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank.into_update().is_err());
    }
}
