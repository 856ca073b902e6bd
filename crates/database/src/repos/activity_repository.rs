//! Activity log repository.

use crate::entities::{now_rfc3339, ActivityEntry, ActivityFilter, NewActivity};
use crate::types::{DatabaseResult, Page};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: &NewActivity) -> DatabaseResult<i64> {
        let details = entry.details.as_ref().map(|value| value.to_string());

        let result = sqlx::query(
            "INSERT INTO activity_logs (user_id, action, entity_type, entity_id, details, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(details)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Newest first, joined with the acting user's public id and username.
    pub async fn list(&self, filter: &ActivityFilter, page: Page) -> DatabaseResult<Vec<ActivityEntry>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT a.id, u.public_id AS user_public_id, u.username AS username, a.action, a.entity_type, a.entity_id, a.details, a.created_at
             FROM activity_logs a
             LEFT JOIN users u ON u.id = a.user_id
             WHERE 1 = 1",
        );

        if let Some(user) = &filter.user_public_id {
            builder.push(" AND u.public_id = ").push_bind(user.clone());
        }
        if let Some(action) = &filter.action {
            builder.push(" AND a.action = ").push_bind(action.clone());
        }

        builder
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(ActivityEntry::from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
