//! Test plan for the `backstage-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use backstage_config::{load, AppConfig, AssistantConfig, AuthConfig, AzuraCastConfig, HttpConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "BACKSTAGE_CONFIG",
    "GROQ_API_KEY",
    "BACKSTAGE__ANALYTICS__REPORT_PATH",
    "BACKSTAGE__ASSISTANT__API_KEY",
    "BACKSTAGE__ASSISTANT__MAX_TOOL_ROUNDS",
    "BACKSTAGE__ASSISTANT__MODEL",
    "BACKSTAGE__AUTH__JWT_SECRET",
    "BACKSTAGE__AUTH__SECURE_WORD",
    "BACKSTAGE__AUTH__SESSION_TTL_SECONDS",
    "BACKSTAGE__AZURACAST__API_KEY",
    "BACKSTAGE__AZURACAST__BASE_URL",
    "BACKSTAGE__AZURACAST__STATION",
    "BACKSTAGE__DATABASE__MAX_CONNECTIONS",
    "BACKSTAGE__DATABASE__URL",
    "BACKSTAGE__HTTP__ADDRESS",
    "BACKSTAGE__HTTP__PORT",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert!(config.auth.secure_word.is_none());
    assert!(config.azuracast.base_url.is_none());
    assert!(config.assistant.api_key.is_none());
    assert_eq!(config.analytics.report_path, defaults.analytics.report_path);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/backstage.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [auth]
        secure_word = "lighthouse"

        [azuracast]
        base_url = "https://radio.example.org"
        station = "backstage_fm"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.auth.secure_word.as_deref(), Some("lighthouse"));
    assert_eq!(config.auth.login_max_attempts, defaults.auth.login_max_attempts);
    assert_eq!(
        config.azuracast.base_url.as_deref(),
        Some("https://radio.example.org")
    );
    assert_eq!(config.azuracast.station, "backstage_fm");
    assert_eq!(
        config.azuracast.request_timeout_seconds,
        defaults.azuracast.request_timeout_seconds
    );
    assert_eq!(config.http.port, defaults.http.port);
}

#[test]
#[serial]
fn load_reads_explicit_file_from_backstage_config() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [assistant]
        model = "llama-3.1-8b-instant"
        "#,
    );
    ctx.set_var(
        "BACKSTAGE_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("explicit configuration file should load");
    assert_eq!(config.assistant.model, "llama-3.1-8b-instant");
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("BACKSTAGE__HTTP__PORT", "9090");
    ctx.set_var("BACKSTAGE__DATABASE__URL", "sqlite://override.db");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 9090);
    assert_eq!(config.database.url, "sqlite://override.db");
}

#[test]
#[serial]
fn load_falls_back_to_groq_api_key_variable() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("GROQ_API_KEY", "gsk-test");

    let config = load().expect("configuration load should read GROQ_API_KEY");
    assert_eq!(config.assistant.api_key.as_deref(), Some("gsk-test"));
}

#[test]
#[serial]
fn load_raises_zero_tool_rounds_to_one() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [assistant]
        max_tool_rounds = 0
        "#,
    );

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.assistant.max_tool_rounds, 1);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "backstage.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_use_development_secret() {
    let defaults = AuthConfig::default();
    assert!(defaults.uses_development_secret());
    assert_eq!(defaults.login_window_seconds, 900);
}

#[test]
fn azuracast_config_defaults_to_unconfigured() {
    let defaults = AzuraCastConfig::default();
    assert!(defaults.base_url.is_none());
    assert!(defaults.api_key.is_none());
    assert_eq!(defaults.station, "1");
}

#[test]
fn assistant_config_defaults_bound_retries() {
    let defaults = AssistantConfig::default();
    assert_eq!(defaults.max_rate_limit_retries, 3);
    assert_eq!(defaults.max_backoff_seconds, 30);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 8080);
}
