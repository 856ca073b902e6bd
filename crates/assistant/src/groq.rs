//! Groq chat-completions client with bounded 429 backoff.

use std::time::Duration;

use async_trait::async_trait;
use backstage_config::AssistantConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::messages::{ChatMessage, CompletionRequest, CompletionResponse, ToolDefinition};
use crate::AssistantError;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

static TRY_AGAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)try again in\s+((?:\d+(?:\.\d+)?(?:ms|h|m|s))+)").expect("invalid retry hint pattern")
});

static DURATION_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)(ms|h|m|s)").expect("invalid duration pattern"));

/// One model turn: send the conversation, get the assistant message back.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, AssistantError>;
}

#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_rate_limit_retries: u32,
    max_backoff: Duration,
}

impl GroqClient {
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AssistantError::NotConfigured)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_rate_limit_retries: config.max_rate_limit_retries,
            max_backoff: Duration::from_secs(config.max_backoff_seconds),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, AssistantError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            temperature: 0.3,
        };

        let mut retries = 0;
        loop {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let headers = response.headers().clone();
                let text = response.text().await.unwrap_or_default();
                let delay = retry_delay(&headers, &text, self.max_backoff);

                if retries >= self.max_rate_limit_retries {
                    warn!(retries, "groq rate limit persisted, giving up");
                    return Err(AssistantError::RateLimited {
                        retry_after: delay.as_secs().max(1),
                    });
                }

                retries += 1;
                warn!(attempt = retries, delay_ms = delay.as_millis() as u64, "groq rate limited, backing off");
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(AssistantError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let bytes = response.bytes().await?;
            let parsed: CompletionResponse = serde_json::from_slice(&bytes)
                .map_err(|e| AssistantError::Decode(e.to_string()))?;

            let message = parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message)
                .ok_or(AssistantError::EmptyResponse)?;

            debug!(
                tool_calls = message.tool_calls.len(),
                has_content = message.content.is_some(),
                "groq completion received"
            );
            return Ok(message);
        }
    }
}

/// How long to wait after a 429.
///
/// Prefers the `retry-after` header (fractional seconds allowed), then a
/// "try again in 1m2.5s" hint in the body, then [`DEFAULT_BACKOFF`]. The
/// result never exceeds `max`, however large the upstream value.
pub fn retry_delay(headers: &HeaderMap, body: &str, max: Duration) -> Duration {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0);

    match from_header.or_else(|| hint_seconds(body)) {
        Some(secs) => Duration::from_secs_f64(secs.min(max.as_secs_f64())),
        None => DEFAULT_BACKOFF.min(max),
    }
}

pub fn parse_retry_hint(body: &str) -> Option<Duration> {
    hint_seconds(body).and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn hint_seconds(body: &str) -> Option<f64> {
    let captures = TRY_AGAIN.captures(body)?;
    let spec = captures.get(1)?.as_str();

    let mut total = 0.0_f64;
    for part in DURATION_PART.captures_iter(spec) {
        let value: f64 = part[1].parse().ok()?;
        total += match &part[2] {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return None,
        };
    }

    (total.is_finite() && total >= 0.0).then_some(total)
}
