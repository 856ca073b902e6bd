//! Session repository for database operations.

use crate::entities::{format_timestamp, now_rfc3339, Session};
use crate::types::{DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> DatabaseResult<Session> {
        let now = now_rfc3339();
        sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(user_id)
            .bind(&now)
            .bind(format_timestamp(expires_at))
            .execute(&self.pool)
            .await?;

        Ok(Session {
            id: id.to_string(),
            user_id,
            created_at: now,
            expires_at: format_timestamp(expires_at),
            revoked_at: None,
        })
    }

    pub async fn find(&self, id: &str) -> DatabaseResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at, expires_at, revoked_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Session::from_row).transpose()?)
    }

    pub async fn revoke(&self, id: &str) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("session"));
        }
        Ok(())
    }

    pub async fn revoke_all_for_user(&self, user_id: i64) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(now_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that expired or were revoked before `before`.
    pub async fn purge_expired(&self, before: DateTime<Utc>) -> DatabaseResult<u64> {
        let cutoff = format_timestamp(before);
        let result = sqlx::query(
            "DELETE FROM sessions WHERE expires_at <= ? OR (revoked_at IS NOT NULL AND revoked_at <= ?)",
        )
        .bind(&cutoff)
        .bind(&cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
