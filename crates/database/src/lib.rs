//! Backstage Database Crate
//!
//! Connection management, embedded migrations and the repositories backing
//! users, sessions, polls, notifications, the vault and the activity log.

use backstage_config::DatabaseConfig;
use tracing::error;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{ping, prepare_database};
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    ActivityRepository, InfoItemRepository, NotificationRepository, PollRepository,
    SessionRepository, UserRepository,
};

pub use entities::{
    format_timestamp, new_public_id, ActivityEntry, ActivityFilter, InfoItem, InfoItemFilter, InfoItemKind,
    InfoItemUpdate, NewActivity, NewInfoItem, NewNotification, NewPoll, NewUser, Notification,
    NotificationKind, Poll, PollOption, PollOptionResult, PollSummary, Session, User, UserRole,
    UserUpdate,
};

pub use types::{DatabaseError, DatabaseResult, Page};

pub use sqlx::SqlitePool;

/// Open the pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config).await.map_err(|e| {
        error!(error = %e, "database connection failed");
        DatabaseError::Connection(format!("{e:#}"))
    })?;

    run_migrations(&pool).await.map_err(|e| {
        error!(error = %e, "database migration failed");
        DatabaseError::Migration(format!("{e:#}"))
    })?;

    Ok(pool)
}
