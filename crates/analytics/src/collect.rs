//! Fetching song history for the batch report job.

use backstage_azuracast::{AzuraCastClient, SongHistoryEntry};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::report::{build_report, AnalyticsReport};
use crate::AnalyticsError;

/// Longest window a single report may cover.
pub const MAX_REPORT_DAYS: u32 = 366;

/// Pull history one day per request and drop duplicate rows at chunk edges.
pub async fn fetch_history(
    client: &AzuraCastClient,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<SongHistoryEntry>, AnalyticsError> {
    let mut history = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let chunk_end = cursor
            .checked_add_signed(Duration::days(1))
            .map_or(end, |next| next.min(end));
        let mut chunk = client.song_history(cursor, chunk_end).await?;
        debug!(from = %cursor, to = %chunk_end, entries = chunk.len(), "fetched history chunk");
        history.append(&mut chunk);
        cursor = chunk_end;
    }

    history.sort_by_key(|entry| entry.sh_id);
    history.dedup_by_key(|entry| entry.sh_id);
    Ok(history)
}

/// Build a report covering the `days` days before `now`.
pub async fn generate_report(
    client: &AzuraCastClient,
    days: u32,
    now: DateTime<Utc>,
) -> Result<AnalyticsReport, AnalyticsError> {
    if days == 0 {
        return Err(AnalyticsError::InvalidRange("days must be at least 1".to_string()));
    }
    if days > MAX_REPORT_DAYS {
        return Err(AnalyticsError::InvalidRange(format!(
            "days must be at most {MAX_REPORT_DAYS}"
        )));
    }

    let start = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| AnalyticsError::InvalidRange("report window is out of range".to_string()))?;
    let history = fetch_history(client, start, now).await?;
    info!(days, entries = history.len(), "building analytics report");

    Ok(build_report(&history, start, now, Utc::now()))
}
