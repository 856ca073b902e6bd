use std::path::{Path, PathBuf};
use std::sync::Arc;

use backstage_assistant::Assistant;
use backstage_auth::Authenticator;
use backstage_azuracast::AzuraCastClient;
use backstage_database::{
    ActivityRepository, InfoItemRepository, NewActivity, NotificationRepository, PollRepository,
    Session, SqlitePool, User, UserRepository,
};
use tracing::warn;

use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    db_pool: SqlitePool,
    authenticator: Authenticator,
    azuracast: AzuraCastClient,
    assistant: Option<Arc<Assistant>>,
    report_path: Arc<PathBuf>,
    polls: PollRepository,
    notifications: NotificationRepository,
    vault: InfoItemRepository,
    activity: ActivityRepository,
}

impl AppState {
    pub fn new(
        db_pool: SqlitePool,
        authenticator: Authenticator,
        azuracast: AzuraCastClient,
        assistant: Option<Arc<Assistant>>,
        report_path: PathBuf,
    ) -> Self {
        Self {
            polls: PollRepository::new(db_pool.clone()),
            notifications: NotificationRepository::new(db_pool.clone()),
            vault: InfoItemRepository::new(db_pool.clone()),
            activity: ActivityRepository::new(db_pool.clone()),
            db_pool,
            authenticator,
            azuracast,
            assistant,
            report_path: Arc::new(report_path),
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.db_pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn users(&self) -> &UserRepository {
        self.authenticator.users()
    }

    pub fn azuracast(&self) -> &AzuraCastClient {
        &self.azuracast
    }

    pub fn assistant(&self) -> Option<&Assistant> {
        self.assistant.as_deref()
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn polls(&self) -> &PollRepository {
        &self.polls
    }

    pub fn notifications(&self) -> &NotificationRepository {
        &self.notifications
    }

    pub fn vault(&self) -> &InfoItemRepository {
        &self.vault
    }

    pub fn activity(&self) -> &ActivityRepository {
        &self.activity
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, Session), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }

    /// Append to the audit log. A failed write is logged and never fails the request.
    pub async fn record_activity(&self, entry: NewActivity) {
        if let Err(error) = self.activity.record(&entry).await {
            warn!(%error, action = %entry.action, "failed to record activity");
        }
    }
}
