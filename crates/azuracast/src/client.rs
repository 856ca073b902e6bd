use std::time::Duration;

use backstage_config::AzuraCastConfig;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::{
    Broadcast, NowPlaying, RawBroadcast, RawCalendarEvent, RawNowPlaying, ScheduleEvent,
    SongHistoryEntry, Streamer, UpcomingEvent,
};
use crate::schedule::ScheduleItem;
use crate::AzuraCastError;

const USER_AGENT: &str = concat!("backstage/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "X-API-Key";

/// Client for a single AzuraCast station.
///
/// Cheap to clone; an unconfigured client answers every call with
/// [`AzuraCastError::NotConfigured`].
#[derive(Clone)]
pub struct AzuraCastClient {
    http: Client,
    base_url: Option<String>,
    api_key: Option<String>,
    station: String,
}

impl AzuraCastClient {
    pub fn new(config: &AzuraCastConfig) -> Result<Self, AzuraCastError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()?;

        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        if base_url.is_none() {
            info!("AzuraCast base_url not set, station features are disabled");
        }

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            station: config.station.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AzuraCastError> {
        let base = self.base_url.as_deref().ok_or(AzuraCastError::NotConfigured)?;
        let url = format!("{base}/api{path}");
        debug!(%method, %url, "AzuraCast request");

        let mut request = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &'static str,
    ) -> Result<T, AzuraCastError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AzuraCastError::NotFound(resource));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), resource, "AzuraCast returned an error");
            return Err(AzuraCastError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| AzuraCastError::Decode(e.to_string()))
    }

    pub async fn now_playing(&self) -> Result<NowPlaying, AzuraCastError> {
        let request = self.request(Method::GET, &format!("/nowplaying/{}", self.station))?;
        let raw: RawNowPlaying = self.send(request, "station").await?;
        Ok(raw.into())
    }

    pub async fn streamers(&self) -> Result<Vec<Streamer>, AzuraCastError> {
        let request =
            self.request(Method::GET, &format!("/station/{}/streamers", self.station))?;
        self.send(request, "station").await
    }

    pub async fn streamer(&self, streamer_id: i64) -> Result<Streamer, AzuraCastError> {
        let request = self.request(
            Method::GET,
            &format!("/station/{}/streamer/{streamer_id}", self.station),
        )?;
        self.send(request, "streamer").await
    }

    /// Replace the streamer's whole schedule. Every item is validated first.
    pub async fn update_streamer_schedule(
        &self,
        streamer_id: i64,
        mut items: Vec<ScheduleItem>,
    ) -> Result<Vec<ScheduleItem>, AzuraCastError> {
        for item in &mut items {
            item.validate().map_err(AzuraCastError::InvalidSchedule)?;
        }

        let request = self
            .request(
                Method::PUT,
                &format!("/station/{}/streamer/{streamer_id}", self.station),
            )?
            .json(&json!({ "schedule_items": items }));

        let _: serde_json::Value = self.send(request, "streamer").await?;
        info!(streamer_id, slots = items.len(), "updated streamer schedule");

        Ok(self.streamer(streamer_id).await?.schedule_items)
    }

    pub async fn add_schedule_item(
        &self,
        streamer_id: i64,
        mut item: ScheduleItem,
    ) -> Result<Vec<ScheduleItem>, AzuraCastError> {
        item.id = None;
        let mut items = self.streamer(streamer_id).await?.schedule_items;
        items.push(item);
        self.update_streamer_schedule(streamer_id, items).await
    }

    pub async fn replace_schedule_item(
        &self,
        streamer_id: i64,
        item_id: i64,
        mut item: ScheduleItem,
    ) -> Result<Vec<ScheduleItem>, AzuraCastError> {
        let mut items = self.streamer(streamer_id).await?.schedule_items;
        let slot = items
            .iter_mut()
            .find(|existing| existing.id == Some(item_id))
            .ok_or(AzuraCastError::NotFound("schedule item"))?;

        item.id = Some(item_id);
        *slot = item;
        self.update_streamer_schedule(streamer_id, items).await
    }

    pub async fn remove_schedule_item(
        &self,
        streamer_id: i64,
        item_id: i64,
    ) -> Result<Vec<ScheduleItem>, AzuraCastError> {
        let mut items = self.streamer(streamer_id).await?.schedule_items;
        let before = items.len();
        items.retain(|existing| existing.id != Some(item_id));
        if items.len() == before {
            return Err(AzuraCastError::NotFound("schedule item"));
        }
        self.update_streamer_schedule(streamer_id, items).await
    }

    /// Streamer calendar between two instants.
    pub async fn schedule(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ScheduleEvent>, AzuraCastError> {
        let request = self
            .request(
                Method::GET,
                &format!("/station/{}/streamers/schedule", self.station),
            )?
            .query(&[("start", start.to_rfc3339()), ("end", end.to_rfc3339())]);

        let raw: Vec<RawCalendarEvent> = self.send(request, "station").await?;
        Ok(raw.into_iter().map(ScheduleEvent::from).collect())
    }

    /// Public schedule of upcoming playlists and live shows.
    pub async fn upcoming_schedule(&self) -> Result<Vec<UpcomingEvent>, AzuraCastError> {
        let request = self.request(Method::GET, &format!("/station/{}/schedule", self.station))?;
        self.send(request, "station").await
    }

    pub async fn broadcasts(&self, streamer_id: i64) -> Result<Vec<Broadcast>, AzuraCastError> {
        let request = self.request(
            Method::GET,
            &format!("/station/{}/streamer/{streamer_id}/broadcasts", self.station),
        )?;
        let raw: Vec<RawBroadcast> = self.send(request, "streamer").await?;
        Ok(raw.into_iter().map(Broadcast::from).collect())
    }

    pub async fn song_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SongHistoryEntry>, AzuraCastError> {
        let request = self
            .request(Method::GET, &format!("/station/{}/history", self.station))?
            .query(&[("start", start.to_rfc3339()), ("end", end.to_rfc3339())]);
        self.send(request, "station").await
    }
}
