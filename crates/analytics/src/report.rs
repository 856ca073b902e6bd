//! Report model and the pure aggregation over song history.

use std::collections::{BTreeMap, HashMap};

use backstage_azuracast::SongHistoryEntry;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TOP_SONGS: usize = 10;
pub const TOP_STREAMERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub range: ReportRange,
    pub totals: ReportTotals,
    pub daily: Vec<DailyStats>,
    /// Always 24 entries, hour 0 through 23 UTC.
    pub hourly: Vec<HourlyStats>,
    pub top_songs: Vec<SongStats>,
    pub top_streamers: Vec<StreamerStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReportTotals {
    pub plays: u64,
    pub unique_songs: u64,
    pub live_plays: u64,
    pub peak_listeners: i64,
    pub average_listeners: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub plays: u64,
    pub peak_listeners: i64,
    pub average_listeners: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HourlyStats {
    pub hour: u32,
    pub plays: u64,
    pub average_listeners: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SongStats {
    pub artist: String,
    pub title: String,
    pub plays: u64,
    pub average_listeners: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StreamerStats {
    pub name: String,
    pub plays: u64,
    pub peak_listeners: i64,
    pub average_listeners: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    plays: u64,
    listener_sum: f64,
    peak: i64,
}

impl Tally {
    fn add(&mut self, listeners: f64) {
        self.plays += 1;
        self.listener_sum += listeners;
        self.peak = self.peak.max(listeners.round() as i64);
    }

    fn average(&self) -> f64 {
        if self.plays == 0 {
            0.0
        } else {
            round2(self.listener_sum / self.plays as f64)
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn listeners(entry: &SongHistoryEntry) -> f64 {
    (entry.listeners_start.max(0) + entry.listeners_end.max(0)) as f64 / 2.0
}

fn song_key(entry: &SongHistoryEntry) -> String {
    if entry.song.id.trim().is_empty() {
        format!("{} - {}", entry.song.artist, entry.song.title).to_lowercase()
    } else {
        entry.song.id.clone()
    }
}

fn song_labels(entry: &SongHistoryEntry) -> (String, String) {
    if entry.song.title.trim().is_empty() {
        if let Some((artist, title)) = entry.song.text.split_once(" - ") {
            return (artist.to_string(), title.to_string());
        }
        return (entry.song.artist.clone(), entry.song.text.clone());
    }
    (entry.song.artist.clone(), entry.song.title.clone())
}

/// Aggregate song history inside `[start, end)` into a report.
///
/// Each play counts the mean of the listener counts at its start and end.
pub fn build_report(
    history: &[SongHistoryEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    generated_at: DateTime<Utc>,
) -> AnalyticsReport {
    let mut overall = Tally::default();
    let mut live_plays = 0;
    let mut daily: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    let mut hourly = [Tally::default(); 24];
    let mut songs: HashMap<String, (String, String, Tally)> = HashMap::new();
    let mut streamers: HashMap<String, Tally> = HashMap::new();

    // `end` is exclusive, so a midnight end does not open another day.
    let last_day = if end.time() == NaiveTime::MIN {
        end.date_naive().pred_opt()
    } else {
        Some(end.date_naive())
    };
    let mut day = start.date_naive();
    while last_day.is_some_and(|last| day <= last) {
        daily.entry(day).or_default();
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    for entry in history {
        let Some(played_at) = Utc.timestamp_opt(entry.played_at, 0).single() else {
            continue;
        };
        if played_at < start || played_at >= end {
            continue;
        }

        let value = listeners(entry);
        overall.add(value);
        daily.entry(played_at.date_naive()).or_default().add(value);
        hourly[played_at.hour() as usize].add(value);

        let (artist, title) = song_labels(entry);
        songs
            .entry(song_key(entry))
            .or_insert_with(|| (artist, title, Tally::default()))
            .2
            .add(value);

        if let Some(streamer) = entry
            .streamer
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            live_plays += 1;
            streamers.entry(streamer.to_string()).or_default().add(value);
        }
    }

    let unique_songs = songs.len() as u64;

    let mut top_songs: Vec<SongStats> = songs
        .into_values()
        .map(|(artist, title, tally)| SongStats {
            artist,
            title,
            plays: tally.plays,
            average_listeners: tally.average(),
        })
        .collect();
    top_songs.sort_by(|a, b| {
        b.plays
            .cmp(&a.plays)
            .then(b.average_listeners.total_cmp(&a.average_listeners))
            .then_with(|| a.title.cmp(&b.title))
    });
    top_songs.truncate(TOP_SONGS);

    let mut top_streamers: Vec<StreamerStats> = streamers
        .into_iter()
        .map(|(name, tally)| StreamerStats {
            name,
            plays: tally.plays,
            peak_listeners: tally.peak,
            average_listeners: tally.average(),
        })
        .collect();
    top_streamers.sort_by(|a, b| {
        b.average_listeners
            .total_cmp(&a.average_listeners)
            .then(b.plays.cmp(&a.plays))
            .then_with(|| a.name.cmp(&b.name))
    });
    top_streamers.truncate(TOP_STREAMERS);

    AnalyticsReport {
        generated_at,
        range: ReportRange { start, end },
        totals: ReportTotals {
            plays: overall.plays,
            unique_songs,
            live_plays,
            peak_listeners: overall.peak,
            average_listeners: overall.average(),
        },
        daily: daily
            .into_iter()
            .map(|(date, tally)| DailyStats {
                date,
                plays: tally.plays,
                peak_listeners: tally.peak,
                average_listeners: tally.average(),
            })
            .collect(),
        hourly: hourly
            .iter()
            .enumerate()
            .map(|(hour, tally)| HourlyStats {
                hour: hour as u32,
                plays: tally.plays,
                average_listeners: tally.average(),
            })
            .collect(),
        top_songs,
        top_streamers,
    }
}
