//! Report file persistence.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::report::AnalyticsReport;
use crate::AnalyticsError;

/// Write the report next to its destination and rename it into place,
/// so readers never observe a half-written file.
pub async fn write_report(path: impl AsRef<Path>, report: &AnalyticsReport) -> Result<(), AnalyticsError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp = temp_path(path);
    let body = serde_json::to_vec_pretty(report)?;
    fs::write(&temp, body).await?;

    if let Err(err) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(err.into());
    }

    info!(path = %path.display(), plays = report.totals.plays, "analytics report written");
    Ok(())
}

pub async fn read_report(path: impl AsRef<Path>) -> Result<AnalyticsReport, AnalyticsError> {
    let path = path.as_ref();
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "analytics report missing");
            return Err(AnalyticsError::NotGenerated(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };

    Ok(serde_json::from_slice(&bytes)?)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "report.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
