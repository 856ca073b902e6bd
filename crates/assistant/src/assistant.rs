use std::sync::Arc;

use backstage_config::AssistantConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::groq::{ChatModel, GroqClient};
use crate::messages::{ChatMessage, Role, ToolCall};
use crate::tools::ToolBox;
use crate::AssistantError;

pub const MAX_HISTORY_MESSAGES: usize = 40;
pub const MAX_MESSAGE_CHARS: usize = 4000;

pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't finish looking that up. Please try asking in a simpler way.";

/// One message of the conversation as the portal sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// Who is asking, for the system prompt.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssistantReply {
    pub content: String,
    /// Tool names in the order they ran.
    pub tools_used: Vec<String>,
}

#[derive(Clone)]
pub struct Assistant {
    model: Arc<dyn ChatModel>,
    station_name: String,
    max_tool_rounds: u32,
}

impl Assistant {
    pub fn new(model: Arc<dyn ChatModel>, config: &AssistantConfig) -> Self {
        Self {
            model,
            station_name: config.station_name.clone(),
            max_tool_rounds: config.max_tool_rounds.max(1),
        }
    }

    /// Build an assistant talking to Groq. Fails with `NotConfigured` without an API key.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = GroqClient::new(config)?;
        info!(model = client.model(), "assistant enabled");
        Ok(Self::new(Arc::new(client), config))
    }

    pub async fn respond(
        &self,
        history: &[ConversationTurn],
        user: &UserContext,
        tools: &dyn ToolBox,
    ) -> Result<AssistantReply, AssistantError> {
        self.respond_at(history, user, tools, Utc::now()).await
    }

    pub async fn respond_at(
        &self,
        history: &[ConversationTurn],
        user: &UserContext,
        tools: &dyn ToolBox,
        now: DateTime<Utc>,
    ) -> Result<AssistantReply, AssistantError> {
        validate_history(history)?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt(user, now)));
        messages.extend(history.iter().map(|turn| match turn.role {
            Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            _ => ChatMessage::user(turn.content.clone()),
        }));

        let definitions = tools.definitions();
        let mut tools_used = Vec::new();

        for round in 1..=self.max_tool_rounds {
            let reply = self.model.complete(&messages, &definitions).await?;

            if reply.tool_calls.is_empty() {
                let content = reply
                    .content
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
                    .ok_or(AssistantError::EmptyResponse)?;
                debug!(round, tools = tools_used.len(), "assistant answered");
                return Ok(AssistantReply {
                    content,
                    tools_used,
                });
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in calls {
                let output = run_tool(tools, &call).await;
                tools_used.push(call.function.name.clone());
                messages.push(ChatMessage::tool(call.id, output));
            }
        }

        warn!(
            rounds = self.max_tool_rounds,
            "assistant exhausted tool rounds without an answer"
        );
        Ok(AssistantReply {
            content: FALLBACK_REPLY.to_string(),
            tools_used,
        })
    }

    fn system_prompt(&self, user: &UserContext, now: DateTime<Utc>) -> String {
        format!(
            "You are the backstage assistant for {station}, helping radio staff with \
             questions about the station. Today is {date}. You are talking to {name} \
             (role: {role}).\n\
             Use the provided tools to look up live data such as what is playing, the \
             schedule, polls, staff and listener statistics instead of guessing. \
             Never reveal passwords or other secret vault values. Keep answers short \
             and friendly.",
            station = self.station_name,
            date = now.format("%A %-d %B %Y"),
            name = user.display_name,
            role = user.role,
        )
    }
}

async fn run_tool(tools: &dyn ToolBox, call: &ToolCall) -> String {
    let name = call.function.name.as_str();
    let raw = call.function.arguments.trim();

    let arguments = if raw.is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(tool = name, %error, "model sent malformed tool arguments");
                return format!("Error: arguments for {name} were not valid JSON ({error})");
            }
        }
    };

    match tools.call(name, arguments).await {
        Ok(output) => {
            debug!(tool = name, "tool call succeeded");
            output
        }
        Err(error) => {
            warn!(tool = name, %error, "tool call failed");
            format!("Error: {error}")
        }
    }
}

pub fn validate_history(history: &[ConversationTurn]) -> Result<(), AssistantError> {
    if history.is_empty() {
        return Err(AssistantError::InvalidHistory(
            "conversation is empty".to_string(),
        ));
    }
    if history.len() > MAX_HISTORY_MESSAGES {
        return Err(AssistantError::InvalidHistory(format!(
            "conversation has more than {MAX_HISTORY_MESSAGES} messages"
        )));
    }

    for (index, turn) in history.iter().enumerate() {
        if !matches!(turn.role, Role::User | Role::Assistant) {
            return Err(AssistantError::InvalidHistory(format!(
                "message {index} must come from the user or the assistant"
            )));
        }
        if turn.content.trim().is_empty() {
            return Err(AssistantError::InvalidHistory(format!(
                "message {index} is empty"
            )));
        }
        if turn.content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AssistantError::InvalidHistory(format!(
                "message {index} exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }
    }

    if history.last().map(|turn| turn.role) != Some(Role::User) {
        return Err(AssistantError::InvalidHistory(
            "the last message must come from the user".to_string(),
        ));
    }

    Ok(())
}
