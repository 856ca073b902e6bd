//! Lookup tools the assistant may call on behalf of the signed-in user.

use async_trait::async_trait;
use backstage_analytics::read_report;
use backstage_assistant::{ToolBox, ToolDefinition, ToolError};
use backstage_database::{InfoItemFilter, InfoItemKind, User};
use serde_json::{json, Value};
use tracing::debug;

use crate::AppState;

const UPCOMING_LIMIT: usize = 10;
const VAULT_LIMIT: usize = 15;
const REPORT_TOP: usize = 5;

pub struct StationToolBox {
    state: AppState,
    user: User,
}

impl StationToolBox {
    pub fn new(state: AppState, user: User) -> Self {
        Self { state, user }
    }

    async fn now_playing(&self) -> Result<Value, ToolError> {
        let now = self.state.azuracast().now_playing().await.map_err(failed)?;
        Ok(json!({
            "station": now.station.name,
            "online": now.is_online,
            "listeners": now.listeners.current,
            "live": now.live.is_live,
            "streamer": now.live.streamer_name,
            "song": now.current_song.as_ref().map(|play| json!({
                "title": play.song.title,
                "artist": play.song.artist,
                "playlist": play.playlist,
            })),
            "next": now.next_song.as_ref().map(|song| format!("{} - {}", song.artist, song.title)),
            "elapsed_seconds": now.elapsed,
            "duration_seconds": now.duration,
        }))
    }

    async fn upcoming_schedule(&self, arguments: &Value) -> Result<Value, ToolError> {
        let limit = optional_usize(arguments, "limit")?
            .unwrap_or(UPCOMING_LIMIT)
            .clamp(1, 25);
        let events = self
            .state
            .azuracast()
            .upcoming_schedule()
            .await
            .map_err(failed)?;

        let events: Vec<Value> = events
            .into_iter()
            .take(limit)
            .map(|event| {
                json!({
                    "type": event.kind,
                    "name": event.name,
                    "title": event.title,
                    "start": event.start,
                    "end": event.end,
                    "on_air_now": event.is_now,
                })
            })
            .collect();
        Ok(json!({ "events": events }))
    }

    async fn active_polls(&self) -> Result<Value, ToolError> {
        let polls = self
            .state
            .polls()
            .list_summaries(self.user.id, false)
            .await
            .map_err(failed)?;

        let polls: Vec<Value> = polls
            .into_iter()
            .map(|summary| {
                json!({
                    "id": summary.poll.public_id,
                    "question": summary.poll.question,
                    "expires_at": summary.poll.expires_at,
                    "total_votes": summary.total_votes,
                    "you_voted": summary.my_vote.is_some(),
                })
            })
            .collect();
        Ok(json!({ "polls": polls }))
    }

    async fn poll_results(&self, arguments: &Value) -> Result<Value, ToolError> {
        let poll_id = required_str(arguments, "poll_id")?;
        let poll = self
            .state
            .polls()
            .find_by_public_id(poll_id)
            .await
            .map_err(failed)?
            .ok_or_else(|| ToolError::Failed(format!("no poll with id {poll_id}")))?;

        let summary = self
            .state
            .polls()
            .summary(poll, self.user.id)
            .await
            .map_err(failed)?;

        let results: Vec<Value> = summary
            .results
            .iter()
            .map(|option| json!({ "option": option.label, "votes": option.votes }))
            .collect();
        Ok(json!({
            "question": summary.poll.question,
            "open": summary.poll.is_open_at(chrono::Utc::now()),
            "total_votes": summary.total_votes,
            "results": results,
        }))
    }

    async fn search_vault(&self, arguments: &Value) -> Result<Value, ToolError> {
        let kind = optional_str(arguments, "kind")?
            .map(|kind| kind.parse::<InfoItemKind>())
            .transpose()
            .map_err(ToolError::InvalidArguments)?;
        let filter = InfoItemFilter {
            kind,
            category: None,
            search: optional_str(arguments, "query")?.map(str::to_string),
        };

        let items = self.state.vault().list(&filter).await.map_err(failed)?;
        let items: Vec<Value> = items
            .into_iter()
            .take(VAULT_LIMIT)
            .map(|item| {
                // Secret values stay in the vault; staff reveal them in the portal.
                let content = (!item.is_secret()).then_some(item.content);
                json!({
                    "id": item.public_id,
                    "kind": item.kind,
                    "title": item.title,
                    "description": item.description,
                    "category": item.category,
                    "content": content,
                })
            })
            .collect();
        Ok(json!({ "items": items }))
    }

    async fn list_staff(&self) -> Result<Value, ToolError> {
        let users = self.state.users().list(false).await.map_err(failed)?;
        let staff: Vec<Value> = users
            .into_iter()
            .map(|user| {
                json!({
                    "name": user.display_name,
                    "username": user.username,
                    "role": user.role,
                })
            })
            .collect();
        Ok(json!({ "staff": staff }))
    }

    async fn listener_stats(&self) -> Result<Value, ToolError> {
        let live = match self.state.azuracast().now_playing().await {
            Ok(now) => Some(now.listeners.current),
            Err(error) => {
                debug!(%error, "live listener count unavailable for assistant");
                None
            }
        };

        let report = match read_report(self.state.report_path()).await {
            Ok(report) => Some(report),
            Err(error) => {
                debug!(%error, "analytics report unavailable for assistant");
                None
            }
        };

        if live.is_none() && report.is_none() {
            return Err(ToolError::Failed(
                "no listener statistics are available right now".to_string(),
            ));
        }

        Ok(json!({
            "current_listeners": live,
            "report": report.map(|report| json!({
                "generated_at": report.generated_at,
                "range": report.range,
                "totals": report.totals,
                "top_songs": report.top_songs.into_iter().take(REPORT_TOP).collect::<Vec<_>>(),
                "top_streamers": report.top_streamers.into_iter().take(REPORT_TOP).collect::<Vec<_>>(),
            })),
        }))
    }
}

#[async_trait]
impl ToolBox for StationToolBox {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let no_arguments = json!({ "type": "object", "properties": {} });
        vec![
            ToolDefinition::function(
                "get_now_playing",
                "Current song, live DJ and listener count on the station.",
                no_arguments.clone(),
            ),
            ToolDefinition::function(
                "get_upcoming_schedule",
                "Upcoming shows and playlists from the station schedule.",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": { "type": "integer", "description": "How many entries, default 10" }
                    }
                }),
            ),
            ToolDefinition::function(
                "list_active_polls",
                "Open staff polls and whether the user has voted.",
                no_arguments.clone(),
            ),
            ToolDefinition::function(
                "get_poll_results",
                "Vote tallies for one poll.",
                json!({
                    "type": "object",
                    "properties": {
                        "poll_id": { "type": "string", "description": "Poll id from list_active_polls" }
                    },
                    "required": ["poll_id"]
                }),
            ),
            ToolDefinition::function(
                "search_vault",
                "Search shared links and documents in the staff vault. Secret values are never returned.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Words to look for" },
                        "kind": { "type": "string", "enum": ["link", "secret", "file"] }
                    }
                }),
            ),
            ToolDefinition::function(
                "list_staff",
                "Active staff members with their roles.",
                no_arguments.clone(),
            ),
            ToolDefinition::function(
                "get_listener_stats",
                "Live listener count plus the latest analytics report totals and top songs.",
                no_arguments,
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        debug!(tool = name, user = %self.user.public_id, "assistant tool call");
        let output = match name {
            "get_now_playing" => self.now_playing().await?,
            "get_upcoming_schedule" => self.upcoming_schedule(&arguments).await?,
            "list_active_polls" => self.active_polls().await?,
            "get_poll_results" => self.poll_results(&arguments).await?,
            "search_vault" => self.search_vault(&arguments).await?,
            "list_staff" => self.list_staff().await?,
            "get_listener_stats" => self.listener_stats().await?,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(output.to_string())
    }
}

fn failed(error: impl std::fmt::Display) -> ToolError {
    ToolError::Failed(error.to_string())
}

fn optional_str<'a>(arguments: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => {
            let value = value.trim();
            Ok((!value.is_empty()).then_some(value))
        }
        Some(_) => Err(ToolError::InvalidArguments(format!("{key} must be a string"))),
    }
}

fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    optional_str(arguments, key)?
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

fn optional_usize(arguments: &Value, key: &str) -> Result<Option<usize>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| ToolError::InvalidArguments(format!("{key} must be a positive integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_helpers_validate_types() {
        let args = json!({ "poll_id": " abc ", "limit": 3, "kind": 7 });
        assert_eq!(required_str(&args, "poll_id").unwrap(), "abc");
        assert_eq!(optional_usize(&args, "limit").unwrap(), Some(3));
        assert!(optional_str(&args, "kind").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert!(optional_usize(&json!({ "limit": -1 }), "limit").is_err());
    }
}
