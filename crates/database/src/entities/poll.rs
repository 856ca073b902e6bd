//! Poll, option and vote entity definitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Poll {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub question: String,
    pub description: Option<String>,
    #[serde(skip_serializing)]
    pub created_by: i64,
    pub is_active: bool,
    pub expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Poll {
    pub(crate) const COLUMNS: &'static str =
        "id, public_id, question, description, created_by, is_active, expires_at, created_at, updated_at";

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            question: row.try_get("question")?,
            description: row.try_get("description")?,
            created_by: row.try_get("created_by")?,
            is_active: row.try_get("is_active")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// True once `expires_at` has passed. Unparseable timestamps count as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match &self.expires_at {
            None => false,
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|expires| expires.with_timezone(&Utc) <= now)
                .unwrap_or(true),
        }
    }

    /// A poll accepts votes while it is active and not expired.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollOption {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub poll_id: i64,
    pub label: String,
    pub position: i64,
}

impl PollOption {
    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            poll_id: row.try_get("poll_id")?,
            label: row.try_get("label")?,
            position: row.try_get("position")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollOptionResult {
    pub option_id: String,
    pub label: String,
    pub position: i64,
    pub votes: i64,
}

/// A poll as seen by one user: tallies plus the option that user picked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSummary {
    #[serde(flatten)]
    pub poll: Poll,
    pub total_votes: i64,
    pub my_vote: Option<String>,
    pub results: Vec<PollOptionResult>,
}

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub question: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: i64,
}

impl NewPoll {
    /// Trim labels and enforce the option count and uniqueness rules.
    pub fn validate(&mut self) -> Result<(), String> {
        self.question = self.question.trim().to_string();
        if self.question.is_empty() {
            return Err("question must not be empty".to_string());
        }
        if self.question.chars().count() > 300 {
            return Err("question must be at most 300 characters".to_string());
        }

        self.options = self
            .options
            .iter()
            .map(|label| label.trim().to_string())
            .collect();

        if self.options.iter().any(|label| label.is_empty()) {
            return Err("option labels must not be empty".to_string());
        }
        if self.options.len() < MIN_POLL_OPTIONS || self.options.len() > MAX_POLL_OPTIONS {
            return Err(format!(
                "a poll needs between {MIN_POLL_OPTIONS} and {MAX_POLL_OPTIONS} options"
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for label in &self.options {
            if !seen.insert(label.to_lowercase()) {
                return Err(format!("duplicate option '{label}'"));
            }
        }

        if let Some(expires_at) = self.expires_at {
            if expires_at <= Utc::now() {
                return Err("expiry must be in the future".to_string());
            }
        }

        Ok(())
    }
}
