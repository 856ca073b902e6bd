//! Activity log entity definitions

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

impl ActivityEntry {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let details: Option<String> = row.try_get("details")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_public_id")?,
            username: row.try_get("username")?,
            action: row.try_get("action")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            details: details.and_then(|raw| serde_json::from_str(&raw).ok()),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(user_id: Option<i64>, action: &str, entity_type: &str) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: None,
            details: None,
        }
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_public_id: Option<String>,
    pub action: Option<String>,
}
