use std::path::PathBuf;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, RETRY_AFTER},
        HeaderMap, Method, Request, StatusCode,
    },
    Router,
};
use backstage_api::{build_router, AppState};
use backstage_auth::{Authenticator, RegisterUser};
use backstage_azuracast::AzuraCastClient;
use backstage_config::{AppConfig, AzuraCastConfig, DatabaseConfig};
use backstage_database::{initialize_database, SqlitePool, UserRole};
use http_body_util::BodyExt;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

type TestResult<T = ()> = anyhow::Result<T>;

const ADMIN_PASSWORD: &str = "correct-horse-battery";

struct TestContext {
    temp_dir: TempDir,
    pool: SqlitePool,
    state: AppState,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        Self::with_azuracast(AzuraCastConfig::default()).await
    }

    async fn with_station(server: &MockServer) -> TestResult<Self> {
        Self::with_azuracast(AzuraCastConfig {
            base_url: Some(server.base_url()),
            api_key: Some("test-key".into()),
            station: "backstage".into(),
            request_timeout_seconds: 2,
        })
        .await
    }

    async fn with_azuracast(azuracast: AzuraCastConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let mut config = AppConfig::default();
        config.database = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("api.sqlite").display()),
            max_connections: 5,
        };
        config.auth.jwt_secret = "api-test-secret".into();

        let pool = initialize_database(&config.database).await?;
        let authenticator = Authenticator::new(pool.clone(), config.auth.clone())?;
        let azuracast = AzuraCastClient::new(&azuracast)?;
        let report_path: PathBuf = temp_dir.path().join("analytics.json");

        let state = AppState::new(pool.clone(), authenticator, azuracast, None, report_path);

        let ctx = Self {
            temp_dir,
            pool,
            state,
        };
        ctx.register("admin", ADMIN_PASSWORD, UserRole::Admin, None)
            .await?;
        Ok(ctx)
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
        streamer_id: Option<i64>,
    ) -> TestResult<String> {
        let user = self
            .state
            .authenticator()
            .register_user(RegisterUser {
                username: username.into(),
                password: password.into(),
                display_name: None,
                email: None,
                role,
                azuracast_streamer_id: streamer_id,
            })
            .await?;
        Ok(user.public_id)
    }

    async fn login(&self, username: &str, password: &str) -> TestResult<String> {
        let (status, _, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {status} {body}");
        Ok(body["token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no token in {body}"))?
            .to_string())
    }

    async fn admin_token(&self) -> TestResult<String> {
        self.login("admin", ADMIN_PASSWORD).await
    }

    async fn staff_token(&self, username: &str) -> TestResult<String> {
        self.register(username, "staff-password-1", UserRole::Staff, None)
            .await?;
        self.login(username, "staff-password-1").await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, HeaderMap, Value)> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => request.body(Body::empty())?,
        };

        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, headers, value))
    }
}

#[tokio::test]
async fn health_reports_database_status() -> TestResult {
    let ctx = TestContext::new().await?;

    let (status, headers, body) = ctx.send(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(headers[CACHE_CONTROL], "no-store");
    Ok(())
}

#[tokio::test]
async fn login_issues_token_usable_for_me() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.admin_token().await?;

    let (status, _, body) = ctx.send(Method::GET, "/api/auth/me", Some(&token), None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_bearer_token() -> TestResult {
    let ctx = TestContext::new().await?;

    for uri in ["/api/auth/me", "/api/polls", "/api/vault", "/api/notifications"] {
        let (status, _, body) = ctx.send(Method::GET, uri, None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["error"].is_string());
    }

    let (status, _, _) = ctx
        .send(Method::GET, "/api/auth/me", Some("not-a-jwt"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_session() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.admin_token().await?;

    let (status, _, _) = ctx
        .send(Method::POST, "/api/auth/logout", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = ctx.send(Method::GET, "/api/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn repeated_failed_logins_are_rate_limited() -> TestResult {
    let ctx = TestContext::new().await?;
    let bad_login = json!({ "username": "admin", "password": "wrong-password" });

    for _ in 0..5 {
        let (status, _, _) = ctx
            .send(Method::POST, "/api/auth/login", None, Some(bad_login.clone()))
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, headers, _) = ctx
        .send(Method::POST, "/api/auth/login", None, Some(bad_login))
        .await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(RETRY_AFTER));

    let failures: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE action = 'auth.login_failed'",
    )
    .fetch_one(&ctx.pool)
    .await?;
    assert_eq!(failures, 6);
    Ok(())
}

#[tokio::test]
async fn poll_lifecycle_counts_votes_and_rejects_duplicates() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;
    let staff = ctx.staff_token("casey").await?;

    let (status, _, poll) = ctx
        .send(
            Method::POST,
            "/api/polls",
            Some(&admin),
            Some(json!({
                "question": "Which jingle for the morning show?",
                "options": ["Upbeat", "Mellow", "Retro"]
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(poll["is_open"], true);
    let poll_id = poll["id"].as_str().unwrap_or_default().to_string();
    let option_id = poll["options"][1]["id"].as_str().unwrap_or_default().to_string();

    let vote_uri = format!("/api/polls/{poll_id}/vote");
    let (status, _, voted) = ctx
        .send(
            Method::POST,
            &vote_uri,
            Some(&staff),
            Some(json!({ "option_id": option_id })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voted["total_votes"], 1);
    assert_eq!(voted["my_vote"], option_id.as_str());
    assert_eq!(voted["options"][1]["votes"], 1);

    let (status, _, _) = ctx
        .send(
            Method::POST,
            &vote_uri,
            Some(&staff),
            Some(json!({ "option_id": option_id })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, closed) = ctx
        .send(Method::POST, &format!("/api/polls/{poll_id}/close"), Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["is_open"], false);

    let (status, _, _) = ctx
        .send(
            Method::POST,
            &vote_uri,
            Some(&admin),
            Some(json!({ "option_id": option_id })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn staff_cannot_create_polls() -> TestResult {
    let ctx = TestContext::new().await?;
    let staff = ctx.staff_token("robin").await?;

    let (status, _, _) = ctx
        .send(
            Method::POST,
            "/api/polls",
            Some(&staff),
            Some(json!({ "question": "Pizza?", "options": ["Yes", "No"] })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn new_poll_notifies_other_staff() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;
    let staff = ctx.staff_token("morgan").await?;

    ctx.send(
        Method::POST,
        "/api/polls",
        Some(&admin),
        Some(json!({ "question": "Studio party date?", "options": ["Friday", "Saturday"] })),
    )
    .await?;

    let (_, _, count) = ctx
        .send(Method::GET, "/api/notifications/unread-count", Some(&staff), None)
        .await?;
    assert_eq!(count["unread_count"], 1);

    let (_, _, admin_count) = ctx
        .send(Method::GET, "/api/notifications/unread-count", Some(&admin), None)
        .await?;
    assert_eq!(admin_count["unread_count"], 0);

    let (_, _, list) = ctx
        .send(Method::GET, "/api/notifications", Some(&staff), None)
        .await?;
    assert_eq!(list["notifications"][0]["kind"], "poll");
    let notification_id = list["notifications"][0]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let (status, _, _) = ctx
        .send(
            Method::POST,
            &format!("/api/notifications/{notification_id}/read"),
            Some(&staff),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, count) = ctx
        .send(Method::GET, "/api/notifications/unread-count", Some(&staff), None)
        .await?;
    assert_eq!(count["unread_count"], 0);

    // Someone else's notification looks missing.
    let (status, _, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/notifications/{notification_id}"),
            Some(&admin),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn vault_masks_secrets_until_revealed() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;
    let staff = ctx.staff_token("sam").await?;

    let (status, _, created) = ctx
        .send(
            Method::POST,
            "/api/vault",
            Some(&admin),
            Some(json!({
                "kind": "secret",
                "title": "Studio wifi",
                "content": "hunter2",
                "category": "studio"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["masked"], true);
    assert!(created["content"].is_null());
    let item_id = created["id"].as_str().unwrap_or_default().to_string();

    let (_, _, listed) = ctx.send(Method::GET, "/api/vault", Some(&staff), None).await?;
    assert_eq!(listed["items"][0]["title"], "Studio wifi");
    assert!(listed["items"][0]["content"].is_null());

    let (status, _, revealed) = ctx
        .send(
            Method::POST,
            &format!("/api/vault/{item_id}/reveal"),
            Some(&staff),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revealed["content"], "hunter2");
    assert_eq!(revealed["masked"], false);

    let reveals: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE action = 'vault.revealed'",
    )
    .fetch_one(&ctx.pool)
    .await?;
    assert_eq!(reveals, 1);

    // Only the creator or an admin may delete.
    let (status, _, _) = ctx
        .send(Method::DELETE, &format!("/api/vault/{item_id}"), Some(&staff), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn vault_rejects_links_without_http_scheme() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;

    let (status, _, body) = ctx
        .send(
            Method::POST,
            "/api/vault",
            Some(&admin),
            Some(json!({ "kind": "link", "title": "Rota", "content": "ftp://rota" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("http"));
    Ok(())
}

#[tokio::test]
async fn activity_log_is_admin_only() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;
    let staff = ctx.staff_token("alex").await?;

    let (status, _, _) = ctx.send(Method::GET, "/api/activity", Some(&staff), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = ctx
        .send(Method::GET, "/api/activity?action=auth.login", Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|entry| entry["action"] == "auth.login"));
    Ok(())
}

#[tokio::test]
async fn last_admin_cannot_be_demoted() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;

    let (_, _, me) = ctx.send(Method::GET, "/api/auth/me", Some(&admin), None).await?;
    let admin_id = me["user"]["id"].as_str().unwrap_or_default().to_string();

    let (status, _, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/users/{admin_id}"),
            Some(&admin),
            Some(json!({ "role": "staff" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = ctx
        .send(
            Method::PATCH,
            &format!("/api/users/{admin_id}"),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn deactivating_a_user_ends_their_sessions() -> TestResult {
    let ctx = TestContext::new().await?;
    let admin = ctx.admin_token().await?;
    let staff = ctx.staff_token("jamie").await?;

    let (_, _, me) = ctx.send(Method::GET, "/api/auth/me", Some(&staff), None).await?;
    let staff_id = me["user"]["id"].as_str().unwrap_or_default().to_string();

    let (status, _, updated) = ctx
        .send(
            Method::PATCH,
            &format!("/api/users/{staff_id}"),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (status, _, _) = ctx.send(Method::GET, "/api/auth/me", Some(&staff), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn station_routes_report_unconfigured_azuracast() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.admin_token().await?;

    let (status, _, body) = ctx
        .send(Method::GET, "/api/station/now-playing", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn dj_may_only_manage_their_own_schedule() -> TestResult {
    let server = MockServer::start_async().await;
    let ctx = TestContext::with_station(&server).await?;
    ctx.register("dj_kim", "dj-password-1", UserRole::Dj, Some(7))
        .await?;
    let dj = ctx.login("dj_kim", "dj-password-1").await?;

    let streamer = json!({
        "id": 7,
        "streamer_username": "dj_kim",
        "display_name": "DJ Kim",
        "is_active": true,
        "enforce_schedule": false,
        "schedule_items": []
    });
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/station/backstage/streamer/7");
            then.status(200).json_body(streamer.clone());
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT).path("/api/station/backstage/streamer/7");
            then.status(200).json_body(json!({ "success": true }));
        })
        .await;

    let (status, _, _) = ctx
        .send(Method::GET, "/api/station/streamers/8/schedule", Some(&dj), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = ctx
        .send(
            Method::POST,
            "/api/station/streamers/7/schedule",
            Some(&dj),
            Some(json!({ "start_time": 2000, "end_time": 2200, "days": [5] })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    put.assert_async().await;

    let (status, _, _) = ctx
        .send(
            Method::POST,
            "/api/station/streamers/7/schedule",
            Some(&dj),
            Some(json!({ "start_time": 2500, "end_time": 2200 })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn dj_replaces_one_schedule_slot() -> TestResult {
    let server = MockServer::start_async().await;
    let ctx = TestContext::with_station(&server).await?;
    ctx.register("dj_kim", "dj-password-1", UserRole::Dj, Some(7))
        .await?;
    let dj = ctx.login("dj_kim", "dj-password-1").await?;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/station/backstage/streamer/7");
            then.status(200).json_body(json!({
                "id": 7,
                "streamer_username": "dj_kim",
                "display_name": "DJ Kim",
                "is_active": true,
                "enforce_schedule": false,
                "schedule_items": [
                    { "id": 1, "start_time": 900, "end_time": 1100, "days": [1] },
                    { "id": 2, "start_time": 1800, "end_time": 1900, "days": [2] }
                ]
            }));
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/station/backstage/streamer/7")
                .json_body(json!({
                    "schedule_items": [
                        { "id": 1, "start_time": 900, "end_time": 1100, "start_date": null, "end_date": null, "days": [1], "loop_once": false },
                        { "id": 2, "start_time": 2000, "end_time": 2200, "start_date": null, "end_date": null, "days": [5], "loop_once": false }
                    ]
                }));
            then.status(200).json_body(json!({ "success": true }));
        })
        .await;

    let (status, _, body) = ctx
        .send(
            Method::PUT,
            "/api/station/streamers/7/schedule/2",
            Some(&dj),
            Some(json!({ "start_time": 2000, "end_time": 2200, "days": [5] })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["streamer_id"], 7);
    put.assert_async().await;

    let updates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE action = 'schedule.updated'",
    )
    .fetch_one(&ctx.pool)
    .await?;
    assert_eq!(updates, 1);

    let (status, _, _) = ctx
        .send(
            Method::PUT,
            "/api/station/streamers/7/schedule/42",
            Some(&dj),
            Some(json!({ "start_time": 2000, "end_time": 2200, "days": [5] })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    put.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn analytics_report_is_missing_until_generated() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.admin_token().await?;

    let (status, _, _) = ctx
        .send(Method::GET, "/api/analytics/report", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!ctx.temp_dir.path().join("analytics.json").exists());
    Ok(())
}

#[tokio::test]
async fn assistant_is_unavailable_without_api_key() -> TestResult {
    let ctx = TestContext::new().await?;
    let token = ctx.admin_token().await?;

    let (status, _, _) = ctx
        .send(
            Method::POST,
            "/api/assistant/chat",
            Some(&token),
            Some(json!({ "messages": [{ "role": "user", "content": "Who is on air?" }] })),
        )
        .await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn openapi_document_lists_routes() -> TestResult {
    let ctx = TestContext::new().await?;

    let (status, _, doc) = ctx
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/polls/{id}/vote"].is_object());
    assert!(doc["paths"]["/api/assistant/chat"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearerAuth"].is_object());
    Ok(())
}
