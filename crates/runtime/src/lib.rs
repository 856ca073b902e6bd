use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use backstage_assistant::{Assistant, AssistantError};
use backstage_auth::Authenticator;
use backstage_azuracast::AzuraCastClient;
use backstage_config::AppConfig;
use backstage_database::initialize_database;
use sqlx::SqlitePool;
use tracing::{info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .with_target(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub azuracast: AzuraCastClient,
    /// `None` when no Groq API key is configured.
    pub assistant: Option<Arc<Assistant>>,
    pub report_path: PathBuf,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone())
            .context("failed to set up authentication")?;

        match authenticator.purge_expired_sessions().await {
            Ok(0) => {}
            Ok(purged) => info!(purged, "removed expired sessions"),
            Err(error) => warn!(%error, "failed to purge expired sessions"),
        }

        let azuracast =
            AzuraCastClient::new(&config.azuracast).context("failed to build AzuraCast client")?;

        let assistant = match Assistant::from_config(&config.assistant) {
            Ok(assistant) => Some(Arc::new(assistant)),
            Err(AssistantError::NotConfigured) => {
                info!("GROQ_API_KEY not set, assistant is disabled");
                None
            }
            Err(error) => return Err(error).context("failed to build assistant"),
        };

        info!(
            azuracast = azuracast.is_configured(),
            assistant = assistant.is_some(),
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            azuracast,
            assistant,
            report_path: PathBuf::from(&config.analytics.report_path),
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
