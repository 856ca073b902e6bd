use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Backstage API", description = "Staff portal for the radio station"),
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::auth::change_password,
        crate::routes::users::list_users,
        crate::routes::users::create_user,
        crate::routes::users::update_user,
        crate::routes::users::reset_password,
        crate::routes::polls::list_polls,
        crate::routes::polls::create_poll,
        crate::routes::polls::get_poll,
        crate::routes::polls::vote,
        crate::routes::polls::close_poll,
        crate::routes::polls::delete_poll,
        crate::routes::notifications::get_notifications,
        crate::routes::notifications::get_unread_count,
        crate::routes::notifications::mark_notification_read,
        crate::routes::notifications::mark_all_read,
        crate::routes::notifications::delete_notification,
        crate::routes::notifications::broadcast_notification,
        crate::routes::vault::list_items,
        crate::routes::vault::create_item,
        crate::routes::vault::get_item,
        crate::routes::vault::reveal_item,
        crate::routes::vault::update_item,
        crate::routes::vault::delete_item,
        crate::routes::activity::list_activity,
        crate::routes::station::now_playing,
        crate::routes::station::list_streamers,
        crate::routes::station::calendar,
        crate::routes::station::get_streamer_schedule,
        crate::routes::station::add_schedule_item,
        crate::routes::station::replace_schedule_item,
        crate::routes::station::remove_schedule_item,
        crate::routes::station::list_broadcasts,
        crate::routes::analytics::get_report,
        crate::routes::analytics::get_live_stats,
        crate::routes::assistant::chat
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::SessionResponse,
            crate::routes::auth::ProfileResponse,
            crate::routes::auth::ChangePasswordRequest,
            crate::routes::users::CreateUserRequest,
            crate::routes::users::UpdateUserRequest,
            crate::routes::users::ResetPasswordRequest,
            crate::routes::models::UserResponse,
            crate::routes::models::UsersResponse,
            crate::routes::models::PollOptionResponse,
            crate::routes::models::PollResponse,
            crate::routes::models::PollsResponse,
            crate::routes::models::CreatePollRequest,
            crate::routes::models::VoteRequest,
            crate::routes::models::NotificationResponse,
            crate::routes::models::NotificationsResponse,
            crate::routes::models::UnreadCountResponse,
            crate::routes::models::BulkUpdateResponse,
            crate::routes::models::BroadcastNotificationRequest,
            crate::routes::models::InfoItemResponse,
            crate::routes::models::InfoItemsResponse,
            crate::routes::models::CreateInfoItemRequest,
            crate::routes::models::UpdateInfoItemRequest,
            crate::routes::models::ActivityResponse,
            crate::routes::models::ActivityListResponse,
            crate::routes::station::StreamersResponse,
            crate::routes::station::CalendarResponse,
            crate::routes::station::ScheduleItemsResponse,
            crate::routes::station::BroadcastsResponse,
            crate::routes::analytics::LiveStatsResponse,
            crate::routes::assistant::ChatRequest,
            backstage_azuracast::NowPlaying,
            backstage_azuracast::StationInfo,
            backstage_azuracast::Listeners,
            backstage_azuracast::LiveStatus,
            backstage_azuracast::Song,
            backstage_azuracast::SongPlay,
            backstage_azuracast::Streamer,
            backstage_azuracast::ScheduleItem,
            backstage_azuracast::ScheduleEvent,
            backstage_azuracast::Broadcast,
            backstage_analytics::AnalyticsReport,
            backstage_analytics::ReportRange,
            backstage_analytics::ReportTotals,
            backstage_analytics::DailyStats,
            backstage_analytics::HourlyStats,
            backstage_analytics::SongStats,
            backstage_analytics::StreamerStats,
            backstage_assistant::ConversationTurn,
            backstage_assistant::AssistantReply,
            backstage_assistant::Role
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Login, logout and password changes"),
        (name = "Users", description = "Staff account administration"),
        (name = "Polls", description = "Staff polls and voting"),
        (name = "Notifications", description = "Per-user notifications"),
        (name = "Vault", description = "Shared links, files and secrets"),
        (name = "Activity", description = "Audit trail of staff actions"),
        (name = "Station", description = "AzuraCast now playing, streamers and schedules"),
        (name = "Analytics", description = "Listener statistics"),
        (name = "Assistant", description = "Station assistant chat")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("JWT".to_string());
        }

        components
            .security_schemes
            .insert("bearerAuth".to_string(), scheme);
    }
}
