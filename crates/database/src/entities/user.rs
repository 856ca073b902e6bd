//! User entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Dj,
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Dj => "dj",
            UserRole::Staff => "staff",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "dj" => Ok(UserRole::Dj),
            "staff" => Ok(UserRole::Staff),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub username: String,
    pub email: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub azuracast_streamer_id: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

impl User {
    pub(crate) const COLUMNS: &'static str = "id, public_id, username, email, display_name, password_hash, role, azuracast_streamer_id, is_active, created_at, updated_at, last_login_at";

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, crate::DatabaseError> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse().map_err(crate::DatabaseError::CorruptRow)?,
            azuracast_streamer_id: row.try_get("azuracast_streamer_id")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_login_at: row.try_get("last_login_at")?,
        })
    }

    /// Whether this user may manage the given AzuraCast streamer's schedule.
    pub fn can_manage_streamer(&self, streamer_id: i64) -> bool {
        self.role.is_admin()
            || (self.role == UserRole::Dj && self.azuracast_streamer_id == Some(streamer_id))
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub display_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub azuracast_streamer_id: Option<i64>,
}

/// Administrative changes to a user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub email: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub azuracast_streamer_id: Option<Option<i64>>,
}
