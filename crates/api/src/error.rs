use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use backstage_analytics::AnalyticsError;
use backstage_assistant::AssistantError;
use backstage_auth::AuthError;
use backstage_azuracast::AzuraCastError;
use backstage_database::DatabaseError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Seconds, sent as `Retry-After` on 429 responses.
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn too_many_requests(message: impl Into<String>, retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        let mut response = (self.status, body).into_response();
        if let Some(seconds) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<DatabaseError> for ApiError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(_) => Self::not_found(error.to_string()),
            DatabaseError::Conflict(message) => Self::conflict(message),
            DatabaseError::Validation(message) => Self::bad_request(message),
            other => {
                error!(error = ?other, "database error");
                Self::internal_server_error("internal server error")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::InvalidToken => {
                warn!(error = %error, "authentication rejected");
                Self::unauthorized(error.to_string())
            }
            AuthError::TooManyAttempts { retry_after } => {
                Self::too_many_requests(error.to_string(), retry_after)
            }
            AuthError::AccountDisabled => Self::forbidden(error.to_string()),
            AuthError::UserExists => Self::conflict(error.to_string()),
            AuthError::UserNotFound => Self::not_found(error.to_string()),
            AuthError::Validation(message) => Self::bad_request(message),
            AuthError::Database(inner) => inner.into(),
            AuthError::PasswordHash(_) | AuthError::Token(_) => {
                error!(error = ?error, "auth error");
                Self::internal_server_error("internal server error")
            }
        }
    }
}

impl From<AzuraCastError> for ApiError {
    fn from(error: AzuraCastError) -> Self {
        match error {
            AzuraCastError::NotConfigured => Self::service_unavailable(error.to_string()),
            AzuraCastError::NotFound(_) => Self::not_found(error.to_string()),
            AzuraCastError::InvalidSchedule(message) => Self::bad_request(message),
            other => {
                error!(error = ?other, "AzuraCast error");
                Self::new(StatusCode::BAD_GATEWAY, "radio station API request failed")
            }
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(error: AnalyticsError) -> Self {
        match error {
            AnalyticsError::NotGenerated(_) => {
                warn!(error = %error, "analytics report requested before generation");
                Self::not_found("analytics report has not been generated yet")
            }
            AnalyticsError::AzuraCast(inner) => inner.into(),
            other => {
                error!(error = ?other, "analytics error");
                Self::internal_server_error("failed to read analytics report")
            }
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(error: AssistantError) -> Self {
        match error {
            AssistantError::NotConfigured => Self::service_unavailable(error.to_string()),
            AssistantError::InvalidHistory(message) => Self::bad_request(message),
            AssistantError::RateLimited { retry_after } => Self::too_many_requests(
                "the assistant is busy, please try again shortly",
                retry_after,
            ),
            other => {
                error!(error = ?other, "assistant error");
                Self::new(StatusCode::BAD_GATEWAY, "assistant request failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(DatabaseError::NotFound("poll")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DatabaseError::Conflict("dup".into())).status,
            StatusCode::CONFLICT
        );
        let internal = ApiError::from(DatabaseError::CorruptRow("bad role".into()));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("bad role"));
    }

    #[test]
    fn lockout_sets_retry_after_header() {
        let response =
            ApiError::from(AuthError::TooManyAttempts { retry_after: 42 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let error = ApiError::from(AzuraCastError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(error.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::from(AssistantError::EmptyResponse).status,
            StatusCode::BAD_GATEWAY
        );
    }
}
