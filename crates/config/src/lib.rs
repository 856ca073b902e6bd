use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "backstage.toml",
    "config/backstage.toml",
    "../backstage.toml",
    "../config/backstage.toml",
    "backend/backstage.toml",
];

/// Secret used when nothing is configured. Fine for local development only.
pub const DEVELOPMENT_JWT_SECRET: &str = "backstage-development-secret-change-me";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub azuracast: AzuraCastConfig,
    pub assistant: AssistantConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://backstage.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Login and session settings.
///
/// ```
/// use backstage_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.session_ttl_seconds, 43_200);
/// assert_eq!(auth.login_max_attempts, 5);
/// assert!(auth.secure_word.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_seconds: u64,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Second login factor shared by all staff. Login skips the check when unset.
    pub secure_word: Option<String>,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 43_200,
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            jwt_issuer: "backstage".to_string(),
            secure_word: None,
            login_max_attempts: 5,
            login_window_seconds: 900,
        }
    }
}

impl AuthConfig {
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzuraCastConfig {
    /// Root of the AzuraCast installation, e.g. `https://radio.example.org`.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Station id or shortcode.
    pub station: String,
    pub request_timeout_seconds: u64,
}

impl Default for AzuraCastConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            station: "1".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

/// Settings for the Groq-backed staff assistant.
///
/// ```
/// use backstage_config::AssistantConfig;
///
/// let assistant = AssistantConfig::default();
/// assert_eq!(assistant.base_url, "https://api.groq.com/openai/v1");
/// assert_eq!(assistant.max_tool_rounds, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub station_name: String,
    pub max_tool_rounds: u32,
    pub max_rate_limit_retries: u32,
    pub max_backoff_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            station_name: "Backstage Radio".to_string(),
            max_tool_rounds: 5,
            max_rate_limit_retries: 3,
            max_backoff_seconds: 30,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub report_path: String,
    pub history_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            report_path: "data/analytics.json".to_string(),
            history_days: 30,
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use backstage_config::load;
///
/// std::env::remove_var("BACKSTAGE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())
        .context("invalid default for http.address")?
        .set_default("http.port", i64::from(defaults.http.port))
        .context("invalid default for http.port")?
        .set_default("database.url", defaults.database.url.clone())
        .context("invalid default for database.url")?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .context("invalid default for database.max_connections")?;

    let environment_overrides = config::Environment::with_prefix("BACKSTAGE").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("BACKSTAGE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via BACKSTAGE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    if config.assistant.api_key.is_none() {
        config.assistant.api_key = std::env::var("GROQ_API_KEY").ok();
    }

    if config.assistant.max_tool_rounds == 0 {
        warn!("assistant.max_tool_rounds must be at least 1, using 1");
        config.assistant.max_tool_rounds = 1;
    }

    debug!(
        http = ?config.http,
        database = ?config.database,
        azuracast_configured = config.azuracast.base_url.is_some(),
        assistant_configured = config.assistant.api_key.is_some(),
        "loaded backend configuration"
    );
    Ok(config)
}
