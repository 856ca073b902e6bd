//! Listener analytics
//!
//! The dashboard reads a report file produced offline by the
//! `build-analytics` command; nothing here runs on the request path except
//! [`read_report`].

mod collect;
pub mod report;
mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use collect::{fetch_history, generate_report, MAX_REPORT_DAYS};
pub use report::{
    build_report, AnalyticsReport, DailyStats, HourlyStats, ReportRange, ReportTotals,
    SongStats, StreamerStats,
};
pub use store::{read_report, write_report};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics report has not been generated yet ({})", .0.display())]
    NotGenerated(PathBuf),
    #[error("invalid report range: {0}")]
    InvalidRange(String),
    #[error("report io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("report is not valid json: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    AzuraCast(#[from] backstage_azuracast::AzuraCastError),
}
