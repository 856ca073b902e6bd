//! User repository for database operations.

use crate::entities::{new_public_id, now_rfc3339, NewUser, User, UserUpdate};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &NewUser) -> DatabaseResult<User> {
        let now = now_rfc3339();
        let public_id = new_public_id();

        let result = sqlx::query(
            "INSERT INTO users (public_id, username, email, display_name, password_hash, role, azuracast_streamer_id, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, TRUE, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&request.password_hash)
        .bind(request.role.as_str())
        .bind(request.azuracast_streamer_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_unique(e, "username or email already in use"))?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or(DatabaseError::NotFound("user"))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", User::COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(User::from_row).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE public_id = ?", User::COLUMNS);
        let row = sqlx::query(&sql)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(User::from_row).transpose()
    }

    /// Username lookups are case-insensitive (the column is `COLLATE NOCASE`).
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", User::COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(User::from_row).transpose()
    }

    pub async fn list(&self, include_inactive: bool) -> DatabaseResult<Vec<User>> {
        let sql = if include_inactive {
            format!("SELECT {} FROM users ORDER BY display_name COLLATE NOCASE", User::COLUMNS)
        } else {
            format!(
                "SELECT {} FROM users WHERE is_active = TRUE ORDER BY display_name COLLATE NOCASE",
                User::COLUMNS
            )
        };
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(User::from_row).collect()
    }

    /// Apply a partial update.
    ///
    /// Demoting or deactivating the last active administrator fails with
    /// `Conflict`. The check runs inside the UPDATE statement, so concurrent
    /// updates cannot both pass it.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> DatabaseResult<User> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        builder.push_bind(now_rfc3339());

        if let Some(display_name) = &update.display_name {
            builder.push(", display_name = ").push_bind(display_name.clone());
        }
        if let Some(email) = &update.email {
            builder.push(", email = ").push_bind(email.clone());
        }
        if let Some(role) = update.role {
            builder.push(", role = ").push_bind(role.as_str());
        }
        if let Some(is_active) = update.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        if let Some(streamer) = update.azuracast_streamer_id {
            builder.push(", azuracast_streamer_id = ").push_bind(streamer);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let removes_admin =
            update.role.is_some_and(|role| !role.is_admin()) || update.is_active == Some(false);
        if removes_admin {
            builder
                .push(
                    " AND (role != 'admin' OR is_active = FALSE OR EXISTS (
                        SELECT 1 FROM users AS other
                        WHERE other.role = 'admin' AND other.is_active = TRUE AND other.id != ",
                )
                .push_bind(id)
                .push("))");
        }

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_unique(e, "email already in use"))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(id).await? {
                Some(_) => Err(DatabaseError::Conflict(
                    "the last active administrator cannot be demoted or deactivated".to_string(),
                )),
                None => Err(DatabaseError::NotFound("user")),
            };
        }

        self.find_by_id(id).await?.ok_or(DatabaseError::NotFound("user"))
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("user"));
        }
        Ok(())
    }

    pub async fn touch_last_login(&self, id: i64) -> DatabaseResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_active_admins(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active = TRUE",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
