use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use backstage_config::AppConfig;
use backstage_runtime::{self, BackendServices};
use sqlx::Row;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config.assistant.api_key = None;
    config.azuracast.base_url = None;
    config
}

async fn initialise(config: &AppConfig) -> Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations_and_leaves_optional_services_off() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let table: String = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'users'",
    )
    .fetch_one(&services.db_pool)
    .await?;

    assert_eq!("users", table);
    assert!(services.assistant.is_none());
    assert!(!services.azuracast.is_configured());
    assert_eq!(
        services.report_path,
        std::path::PathBuf::from(&config.analytics.report_path)
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_enables_assistant_and_station_when_configured() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = build_config(sqlite_url(&temp_dir.path().join("full.db")), 2);
    config.assistant.api_key = Some("gsk-unit-test".into());
    config.azuracast.base_url = Some("https://radio.example.org/".into());

    let services = initialise(&config).await?;
    assert!(services.assistant.is_some());
    assert!(services.azuracast.is_configured());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_creates_sqlite_directory_if_missing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_dir = temp_dir.path().join("nested");
    let db_path = db_dir.join("prepared.db");
    let config = build_config(sqlite_url(&db_path), 2);

    assert!(!db_dir.exists());

    let _services = initialise(&config).await?;
    assert!(db_dir.exists(), "database directory should be created");
    assert!(db_path.exists(), "sqlite database file should be created");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_enables_sqlite_foreign_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(sqlite_url(&temp_dir.path().join("fk.db")), 2);

    let services = initialise(&config).await?;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!(1, enabled, "foreign key enforcement must be enabled");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_applies_max_connections_setting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let max_connections = 3;
    let config = build_config(
        sqlite_url(&temp_dir.path().join("max_conn.db")),
        max_connections,
    );

    let services = initialise(&config).await?;
    assert_eq!(
        max_connections,
        services.db_pool.options().get_max_connections()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn memory_database_creates_no_files() -> Result<()> {
    let config = build_config("sqlite://:memory:".into(), 1);
    let services = initialise(&config).await?;

    let databases = sqlx::query("PRAGMA database_list")
        .fetch_all(&services.db_pool)
        .await?;
    let main_db = databases
        .into_iter()
        .find(|row| {
            row.try_get::<String, _>("name")
                .map(|name| name == "main")
                .unwrap_or(false)
        })
        .context("expected main in PRAGMA database_list")?;
    let file: String = main_db.try_get("file")?;
    assert!(
        file.is_empty(),
        "in-memory sqlite database should not create filesystem entries"
    );
    Ok(())
}

#[test]
fn telemetry_init_tracing_sets_global_subscriber() {
    backstage_runtime::telemetry::init_tracing().expect("first initialisation should succeed");

    let second = backstage_runtime::telemetry::init_tracing();
    assert!(
        second.is_err(),
        "initialising telemetry twice should fail with global subscriber already set"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[cfg_attr(not(unix), ignore = "requires Unix signal handling")]
async fn shutdown_signal_completes_on_ctrl_c_notification() -> Result<()> {
    let shutdown_task = tokio::spawn(async { backstage_runtime::shutdown_signal().await });

    sleep(Duration::from_millis(50)).await;
    #[cfg(unix)]
    unsafe {
        libc::raise(libc::SIGINT);
    }

    timeout(Duration::from_secs(2), shutdown_task).await??;
    Ok(())
}
