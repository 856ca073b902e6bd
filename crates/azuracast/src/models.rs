//! Wire types returned by the AzuraCast REST API, plus the shapes we expose.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schedule::ScheduleItem;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawNowPlaying {
    pub station: RawStation,
    pub listeners: Listeners,
    pub live: RawLive,
    pub now_playing: Option<RawSongPlay>,
    pub playing_next: Option<RawSongPlay>,
    pub song_history: Vec<RawSongPlay>,
    pub is_online: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStation {
    pub id: i64,
    pub name: String,
    pub shortcode: String,
    pub listen_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLive {
    pub is_live: bool,
    pub streamer_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSong {
    pub id: String,
    pub text: String,
    pub artist: String,
    pub title: String,
    pub album: String,
    pub art: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSongPlay {
    pub sh_id: i64,
    pub played_at: i64,
    pub duration: i64,
    pub elapsed: Option<i64>,
    pub playlist: Option<String>,
    pub streamer: Option<String>,
    pub is_request: bool,
    pub song: RawSong,
}

/// One row of `/api/station/{station}/history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SongHistoryEntry {
    pub sh_id: i64,
    pub played_at: i64,
    pub duration: i64,
    pub playlist: Option<String>,
    pub streamer: Option<String>,
    pub is_request: bool,
    pub song: HistorySong,
    pub listeners_start: i64,
    pub listeners_end: i64,
    pub delta_total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySong {
    pub id: String,
    pub text: String,
    pub artist: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Listeners {
    pub current: i64,
    pub unique: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StationInfo {
    pub id: i64,
    pub name: String,
    pub shortcode: String,
    pub listen_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LiveStatus {
    pub is_live: bool,
    pub streamer_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub art: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SongPlay {
    pub song: Song,
    pub played_at: Option<DateTime<Utc>>,
    pub duration: i64,
    pub playlist: Option<String>,
    pub streamer: Option<String>,
}

/// Now-playing state flattened for the portal.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NowPlaying {
    pub station: StationInfo,
    pub is_online: bool,
    pub listeners: Listeners,
    pub live: LiveStatus,
    pub current_song: Option<SongPlay>,
    pub elapsed: i64,
    pub duration: i64,
    pub next_song: Option<Song>,
    pub recent_songs: Vec<SongPlay>,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    Utc.timestamp_opt(seconds, 0).single()
}

impl From<RawSong> for Song {
    fn from(raw: RawSong) -> Self {
        let (artist, title) = if raw.title.trim().is_empty() {
            match raw.text.split_once(" - ") {
                Some((artist, title)) => (artist.to_string(), title.to_string()),
                None => (raw.artist, raw.text),
            }
        } else {
            (raw.artist, raw.title)
        };

        Self {
            title,
            artist,
            album: non_empty(raw.album),
            art: raw.art.and_then(non_empty),
        }
    }
}

impl From<RawSongPlay> for SongPlay {
    fn from(raw: RawSongPlay) -> Self {
        Self {
            played_at: timestamp(raw.played_at),
            duration: raw.duration,
            playlist: raw.playlist.and_then(non_empty),
            streamer: raw.streamer.and_then(non_empty),
            song: raw.song.into(),
        }
    }
}

impl From<RawNowPlaying> for NowPlaying {
    fn from(raw: RawNowPlaying) -> Self {
        let (elapsed, duration) = raw
            .now_playing
            .as_ref()
            .map(|play| (play.elapsed.unwrap_or_default(), play.duration))
            .unwrap_or_default();

        Self {
            station: StationInfo {
                id: raw.station.id,
                name: raw.station.name,
                shortcode: raw.station.shortcode,
                listen_url: raw.station.listen_url.and_then(non_empty),
            },
            is_online: raw.is_online,
            listeners: raw.listeners,
            live: LiveStatus {
                is_live: raw.live.is_live,
                streamer_name: if raw.live.is_live {
                    non_empty(raw.live.streamer_name)
                } else {
                    None
                },
            },
            current_song: raw.now_playing.map(SongPlay::from),
            elapsed,
            duration,
            next_song: raw.playing_next.map(|next| next.song.into()),
            recent_songs: raw.song_history.into_iter().map(SongPlay::from).collect(),
        }
    }
}

/// A streamer (DJ) account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Streamer {
    pub id: i64,
    pub streamer_username: String,
    pub display_name: Option<String>,
    pub comments: Option<String>,
    pub is_active: bool,
    pub enforce_schedule: bool,
    pub schedule_items: Vec<ScheduleItem>,
}

impl Streamer {
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.streamer_username)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawCalendarEvent {
    pub id: i64,
    pub title: String,
    pub start: String,
    pub end: String,
}

/// A concrete occurrence of a streamer's recurring slot.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScheduleEvent {
    pub streamer_id: i64,
    pub title: String,
    pub start: String,
    pub end: String,
}

impl From<RawCalendarEvent> for ScheduleEvent {
    fn from(raw: RawCalendarEvent) -> Self {
        Self {
            streamer_id: raw.id,
            title: raw.title,
            start: raw.start,
            end: raw.end,
        }
    }
}

/// Public station schedule entry (playlists and streamers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpcomingEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub is_now: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawBroadcast {
    pub id: i64,
    #[serde(rename = "timestampStart")]
    pub timestamp_start: i64,
    #[serde(rename = "timestampEnd")]
    pub timestamp_end: i64,
    pub recording: Option<RawRecording>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawRecording {
    pub size: i64,
    pub links: RawRecordingLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawRecordingLinks {
    pub download: Option<String>,
}

/// A past live broadcast by one streamer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Broadcast {
    pub id: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub recording_url: Option<String>,
    pub recording_size: Option<i64>,
}

impl From<RawBroadcast> for Broadcast {
    fn from(raw: RawBroadcast) -> Self {
        Self {
            id: raw.id,
            started_at: timestamp(raw.timestamp_start),
            ended_at: timestamp(raw.timestamp_end),
            recording_url: raw
                .recording
                .as_ref()
                .and_then(|recording| recording.links.download.clone()),
            recording_size: raw.recording.map(|recording| recording.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn song_falls_back_to_text_when_title_missing() {
        let raw: RawSong = serde_json::from_value(json!({
            "text": "Boards of Canada - Roygbiv",
            "artist": "",
            "title": "",
            "album": ""
        }))
        .unwrap();

        let song = Song::from(raw);
        assert_eq!(song.artist, "Boards of Canada");
        assert_eq!(song.title, "Roygbiv");
        assert!(song.album.is_none());
    }

    #[test]
    fn now_playing_drops_streamer_name_when_not_live() {
        let raw: RawNowPlaying = serde_json::from_value(json!({
            "station": { "id": 1, "name": "Backstage FM", "shortcode": "backstage" },
            "listeners": { "current": 12, "unique": 9, "total": 12 },
            "live": { "is_live": false, "streamer_name": "stale" },
            "now_playing": {
                "played_at": 1_700_000_000,
                "duration": 200,
                "elapsed": 50,
                "song": { "artist": "Air", "title": "La Femme d'Argent", "album": "Moon Safari" }
            },
            "playing_next": { "song": { "artist": "Air", "title": "Sexy Boy" } },
            "song_history": [],
            "is_online": true
        }))
        .unwrap();

        let now = NowPlaying::from(raw);
        assert!(!now.live.is_live);
        assert!(now.live.streamer_name.is_none());
        assert_eq!(now.elapsed, 50);
        assert_eq!(now.duration, 200);
        assert_eq!(now.listeners.current, 12);
        assert_eq!(now.next_song.unwrap().title, "Sexy Boy");
        assert_eq!(
            now.current_song.unwrap().played_at.unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn broadcast_without_recording() {
        let raw: RawBroadcast = serde_json::from_value(json!({
            "id": 4,
            "timestampStart": 1_700_000_000,
            "timestampEnd": 0,
            "recording": null
        }))
        .unwrap();

        let broadcast = Broadcast::from(raw);
        assert!(broadcast.started_at.is_some());
        assert!(broadcast.ended_at.is_none());
        assert!(broadcast.recording_url.is_none());
    }
}
