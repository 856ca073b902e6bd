//! HTTP surface of the Backstage staff portal.
//!
//! [`build_router`] wires every route onto a shared [`AppState`]. Handlers
//! authenticate through the bearer token, talk to the repositories and
//! upstream clients, and map failures onto [`ApiError`].

mod docs;
mod error;
mod middleware;
mod state;
mod tools;
mod util;

pub mod routes;

pub use docs::ApiDoc;
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;
pub use tools::StationToolBox;

use axum::{
    middleware::from_fn,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use utoipa::OpenApi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_document))
        // Auth routes
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/password", post(routes::auth::change_password))
        // User administration
        .route(
            "/api/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/api/users/:id", patch(routes::users::update_user))
        .route("/api/users/:id/password", post(routes::users::reset_password))
        // Poll routes
        .route(
            "/api/polls",
            get(routes::polls::list_polls).post(routes::polls::create_poll),
        )
        .route(
            "/api/polls/:id",
            get(routes::polls::get_poll).delete(routes::polls::delete_poll),
        )
        .route("/api/polls/:id/vote", post(routes::polls::vote))
        .route("/api/polls/:id/close", post(routes::polls::close_poll))
        // Notification routes
        .route(
            "/api/notifications",
            get(routes::notifications::get_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(routes::notifications::get_unread_count),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/broadcast",
            post(routes::notifications::broadcast_notification),
        )
        .route(
            "/api/notifications/:id",
            delete(routes::notifications::delete_notification),
        )
        .route(
            "/api/notifications/:id/read",
            post(routes::notifications::mark_notification_read),
        )
        // Vault routes
        .route(
            "/api/vault",
            get(routes::vault::list_items).post(routes::vault::create_item),
        )
        .route(
            "/api/vault/:id",
            get(routes::vault::get_item)
                .put(routes::vault::update_item)
                .delete(routes::vault::delete_item),
        )
        .route("/api/vault/:id/reveal", post(routes::vault::reveal_item))
        .route("/api/activity", get(routes::activity::list_activity))
        // Station routes
        .route(
            "/api/station/now-playing",
            get(routes::station::now_playing),
        )
        .route(
            "/api/station/streamers",
            get(routes::station::list_streamers),
        )
        .route("/api/station/schedule", get(routes::station::calendar))
        .route(
            "/api/station/streamers/:id/schedule",
            get(routes::station::get_streamer_schedule).post(routes::station::add_schedule_item),
        )
        .route(
            "/api/station/streamers/:id/schedule/:item_id",
            put(routes::station::replace_schedule_item)
                .delete(routes::station::remove_schedule_item),
        )
        .route(
            "/api/station/streamers/:id/broadcasts",
            get(routes::station::list_broadcasts),
        )
        // Analytics and assistant
        .route("/api/analytics/report", get(routes::analytics::get_report))
        .route("/api/analytics/live", get(routes::analytics::get_live_stats))
        .route("/api/assistant/chat", post(routes::assistant::chat))
        .with_state(state)
        .layer(from_fn(middleware::logging_middleware))
        .layer(middleware::trace_layer())
        .layer(middleware::no_store_layer())
        .layer(middleware::cors_layer())
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
