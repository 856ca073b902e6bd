//! Request and response bodies shared by the route modules.

use backstage_database::{
    ActivityEntry, InfoItem, Notification, PollOptionResult, PollSummary, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// `admin`, `dj` or `staff`.
    pub role: String,
    pub azuracast_streamer_id: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
    pub last_login_at: Option<String>,
}

impl From<User> for UserResponse {
    fn from(value: User) -> Self {
        Self {
            id: value.public_id,
            username: value.username,
            display_name: value.display_name,
            email: value.email,
            role: value.role.to_string(),
            azuracast_streamer_id: value.azuracast_streamer_id,
            is_active: value.is_active,
            created_at: value.created_at,
            last_login_at: value.last_login_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PollOptionResponse {
    pub id: String,
    pub label: String,
    pub votes: i64,
}

impl From<PollOptionResult> for PollOptionResponse {
    fn from(value: PollOptionResult) -> Self {
        Self {
            id: value.option_id,
            label: value.label,
            votes: value.votes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PollResponse {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Active and not past its expiry.
    pub is_open: bool,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub total_votes: i64,
    /// Option id the caller voted for.
    pub my_vote: Option<String>,
    pub options: Vec<PollOptionResponse>,
}

impl From<PollSummary> for PollResponse {
    fn from(value: PollSummary) -> Self {
        let is_open = value.poll.is_open_at(Utc::now());
        Self {
            id: value.poll.public_id,
            question: value.poll.question,
            description: value.poll.description,
            is_active: value.poll.is_active,
            is_open,
            expires_at: value.poll.expires_at,
            created_at: value.poll.created_at,
            total_votes: value.total_votes,
            my_vote: value.my_vote,
            options: value.results.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PollsResponse {
    pub polls: Vec<PollResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePollRequest {
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteRequest {
    pub option_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: String,
    /// `info`, `poll`, `schedule` or `system`.
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(value: Notification) -> Self {
        Self {
            id: value.public_id,
            kind: value.kind.as_str().to_string(),
            title: value.title,
            body: value.body,
            link: value.link,
            is_read: value.is_read,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastNotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub link: Option<String>,
    /// Defaults to `info`.
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InfoItemResponse {
    pub id: String,
    /// `link`, `secret` or `file`.
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    /// Omitted for secrets; use the reveal endpoint.
    pub content: Option<String>,
    pub masked: bool,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InfoItemResponse {
    pub fn masked(item: InfoItem) -> Self {
        let masked = item.is_secret();
        Self::build(item, masked)
    }

    pub fn revealed(item: InfoItem) -> Self {
        Self::build(item, false)
    }

    fn build(item: InfoItem, masked: bool) -> Self {
        Self {
            id: item.public_id,
            kind: item.kind.as_str().to_string(),
            title: item.title,
            description: item.description,
            content: (!masked).then_some(item.content),
            masked,
            category: item.category,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InfoItemsResponse {
    pub items: Vec<InfoItemResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInfoItemRequest {
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInfoItemRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: i64,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    pub created_at: String,
}

impl From<ActivityEntry> for ActivityResponse {
    fn from(value: ActivityEntry) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            username: value.username,
            action: value.action,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            details: value.details,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityListResponse {
    pub entries: Vec<ActivityResponse>,
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
