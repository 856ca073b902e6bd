//! Notification repository for database operations.

use crate::entities::{new_public_id, now_rfc3339, NewNotification, Notification};
use crate::types::{DatabaseError, DatabaseResult, Page};
use sqlx::SqlitePool;

const NOTIFICATION_COLUMNS: &str =
    "id, public_id, user_id, kind, title, body, link, is_read, created_at";

#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        request: &NewNotification,
    ) -> DatabaseResult<Notification> {
        let public_id = new_public_id();
        let now = now_rfc3339();

        let result = sqlx::query(
            "INSERT INTO notifications (public_id, user_id, kind, title, body, link, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, ?, FALSE, ?)",
        )
        .bind(&public_id)
        .bind(user_id)
        .bind(request.kind.as_str())
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.link)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            public_id,
            user_id,
            kind: request.kind,
            title: request.title.clone(),
            body: request.body.clone(),
            link: request.link.clone(),
            is_read: false,
            created_at: now,
        })
    }

    /// Fan a notification out to every active user, optionally skipping one (usually the author).
    pub async fn create_for_all_active_users(
        &self,
        request: &NewNotification,
        except_user_id: Option<i64>,
    ) -> DatabaseResult<u64> {
        let recipients: Vec<i64> = sqlx::query_scalar("SELECT id FROM users WHERE is_active = TRUE")
            .fetch_all(&self.pool)
            .await?;

        let now = now_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut created = 0;

        for user_id in recipients
            .into_iter()
            .filter(|id| Some(*id) != except_user_id)
        {
            sqlx::query(
                "INSERT INTO notifications (public_id, user_id, kind, title, body, link, is_read, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, FALSE, ?)",
            )
            .bind(new_public_id())
            .bind(user_id)
            .bind(request.kind.as_str())
            .bind(&request.title)
            .bind(&request.body)
            .bind(&request.link)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            created += 1;
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn list(
        &self,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> DatabaseResult<Vec<Notification>> {
        let sql = if unread_only {
            format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? AND is_read = FALSE
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            )
        } else {
            format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?
                 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
            )
        };

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(Notification::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn unread_count(&self, user_id: i64) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one of the user's notifications read. Other users' notifications are invisible.
    pub async fn mark_read(&self, user_id: i64, public_id: &str) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE public_id = ? AND user_id = ?",
        )
        .bind(public_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("notification"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, user_id: i64, public_id: &str) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE public_id = ? AND user_id = ?")
            .bind(public_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("notification"));
        }
        Ok(())
    }
}
