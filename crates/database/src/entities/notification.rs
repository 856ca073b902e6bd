//! Notification entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Poll,
    Schedule,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Poll => "poll",
            NotificationKind::Schedule => "schedule",
            NotificationKind::System => "system",
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            "poll" => NotificationKind::Poll,
            "schedule" => NotificationKind::Schedule,
            "system" => NotificationKind::System,
            _ => NotificationKind::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl Notification {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            user_id: row.try_get("user_id")?,
            kind: NotificationKind::from(kind.as_str()),
            title: row.try_get("title")?,
            body: row.try_get("body")?,
            link: row.try_get("link")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}
