//! AzuraCast REST client
//!
//! Typed access to the now-playing, streamer, schedule, broadcast and song
//! history endpoints of one AzuraCast station.

mod client;
pub mod models;
pub mod schedule;

pub use client::AzuraCastClient;
pub use models::{
    Broadcast, HistorySong, Listeners, LiveStatus, NowPlaying, ScheduleEvent, Song,
    SongHistoryEntry, SongPlay, StationInfo, Streamer, UpcomingEvent,
};
pub use schedule::ScheduleItem;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AzuraCastError {
    #[error("AzuraCast is not configured")]
    NotConfigured,
    #[error("AzuraCast request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("AzuraCast returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode AzuraCast response: {0}")]
    Decode(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}
