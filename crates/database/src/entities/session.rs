//! Session entity definitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: String,
    pub revoked_at: Option<String>,
}

impl Session {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            revoked_at: row.try_get("revoked_at")?,
        })
    }

    /// Usable while not revoked and not past its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|expires| expires.with_timezone(&Utc) > now)
            .unwrap_or(false)
    }
}
