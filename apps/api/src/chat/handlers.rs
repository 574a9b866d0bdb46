use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use super::service::{respond, ChatContext, ChatReply};
use crate::auth::extractor::{CurrentUser, MaybeUser};
use crate::errors::AppError;
use crate::models::chat::ChatMessageRow;
use crate::state::AppState;

pub const CHAT_ERROR_MESSAGE: &str =
    "There was an error processing your request. Please try again later.";

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub role: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<IncomingMessage>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Failure of `POST /api/chat`, rendered as the widget expects: `{"error": "..."}`.
#[derive(Debug)]
pub struct ChatApiError(pub String);

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        error!("Error in chat API: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": CHAT_ERROR_MESSAGE })),
        )
            .into_response()
    }
}

fn parse_user_id(raw: Option<&str>) -> Option<Uuid> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Ignoring malformed chat userId '{raw}'");
            None
        }
    }
}

/// The user a chat turn is recorded for. A bearer session always wins over the
/// widget's `userId`; without a session the `userId` is taken as sent.
fn resolve_chat_user(session_user: Option<Uuid>, claimed: Option<Uuid>) -> Option<Uuid> {
    match (session_user, claimed) {
        (Some(session_user), Some(claimed)) if session_user != claimed => {
            warn!(
                "Chat userId {claimed} does not match session user {session_user}, using the session"
            );
            Some(session_user)
        }
        (Some(session_user), _) => Some(session_user),
        (None, claimed) => claimed,
    }
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    viewer: MaybeUser,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ChatApiError> {
    let Json(req) = body.map_err(|e| ChatApiError(e.body_text()))?;

    let message = req
        .messages
        .last()
        .ok_or_else(|| ChatApiError("request contained no messages".to_string()))?;
    if let Some(role) = message.role.as_deref().filter(|r| *r != "user") {
        warn!("Last chat message has role '{role}', answering it as the user");
    }

    let ctx = ChatContext {
        store: state.store.as_ref(),
        catalog: &state.catalog,
        llm: state.llm.as_deref(),
        picker: &state.picker,
    };
    let user_id = resolve_chat_user(
        viewer.user().map(|u| u.id),
        parse_user_id(req.user_id.as_deref()),
    );

    Ok(Json(respond(&ctx, &message.content, user_id).await))
}

/// GET /api/v1/chat/history
/// Messages of the signed-in user's most recent conversation, oldest first.
pub async fn handle_chat_history(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ChatMessageRow>>, AppError> {
    let messages = match state.store.latest_conversation(current.user.id).await? {
        Some(conversation_id) => state.store.conversation_messages(conversation_id).await?,
        None => Vec::new(),
    };
    Ok(Json(messages))
}
