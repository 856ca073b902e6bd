use axum::{extract::State, http::HeaderMap, Json};
use backstage_assistant::{AssistantError, AssistantReply, ConversationTurn, UserContext};
use backstage_database::NewActivity;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{tools::StationToolBox, util::current_user, ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation so far, oldest first, ending with the user's question.
    pub messages: Vec<ConversationTurn>,
}

#[utoipa::path(
    post,
    path = "/api/assistant/chat",
    tag = "Assistant",
    security(("bearerAuth" = [])),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = AssistantReply),
        (status = 400, description = "Invalid conversation", body = crate::error::ErrorResponse),
        (status = 429, description = "Model rate limit persisted", body = crate::error::ErrorResponse),
        (status = 503, description = "Assistant not configured", body = crate::error::ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<AssistantReply>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let assistant = state.assistant().ok_or(AssistantError::NotConfigured)?;

    let context = UserContext {
        display_name: user.display_name.clone(),
        role: user.role.to_string(),
    };
    let tools = StationToolBox::new(state.clone(), user.clone());

    let reply = assistant
        .respond(&payload.messages, &context, &tools)
        .await?;

    state
        .record_activity(
            NewActivity::new(Some(user.id), "assistant.chat", "assistant")
                .details(json!({ "tools_used": reply.tools_used })),
        )
        .await;

    Ok(Json(reply))
}
