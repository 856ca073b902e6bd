//! Vault item repository for database operations.

use crate::entities::{
    new_public_id, now_rfc3339, InfoItem, InfoItemFilter, InfoItemUpdate, NewInfoItem,
};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

#[derive(Clone)]
pub struct InfoItemRepository {
    pool: SqlitePool,
}

impl InfoItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &NewInfoItem) -> DatabaseResult<InfoItem> {
        let public_id = new_public_id();
        let now = now_rfc3339();

        let result = sqlx::query(
            "INSERT INTO info_items (public_id, kind, title, description, content, category, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.kind.as_str())
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.content)
        .bind(&request.category)
        .bind(request.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(InfoItem {
            id: result.last_insert_rowid(),
            public_id,
            kind: request.kind,
            title: request.title.clone(),
            description: request.description.clone(),
            content: request.content.clone(),
            category: request.category.clone(),
            created_by: request.created_by,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<InfoItem>> {
        let sql = format!("SELECT {} FROM info_items WHERE public_id = ?", InfoItem::COLUMNS);
        let row = sqlx::query(&sql)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(InfoItem::from_row).transpose()
    }

    pub async fn list(&self, filter: &InfoItemFilter) -> DatabaseResult<Vec<InfoItem>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM info_items WHERE 1 = 1",
            InfoItem::COLUMNS
        ));

        if let Some(kind) = filter.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(category) = &filter.category {
            builder
                .push(" AND category = ")
                .push_bind(category.clone())
                .push(" COLLATE NOCASE");
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            builder
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR IFNULL(description, '') LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR IFNULL(category, '') LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        builder.push(" ORDER BY category COLLATE NOCASE, title COLLATE NOCASE");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(InfoItem::from_row).collect()
    }

    pub async fn update(&self, id: i64, update: &InfoItemUpdate) -> DatabaseResult<InfoItem> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE info_items SET updated_at = ");
        builder.push_bind(now_rfc3339());

        if let Some(title) = &update.title {
            builder.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &update.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(content) = &update.content {
            builder.push(", content = ").push_bind(content.clone());
        }
        if let Some(category) = &update.category {
            builder.push(", category = ").push_bind(category.clone());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("vault item"));
        }

        let sql = format!("SELECT {} FROM info_items WHERE id = ?", InfoItem::COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_one(&self.pool).await?;
        InfoItem::from_row(&row)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM info_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("vault item"));
        }
        Ok(())
    }
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
