//! The `/api` routes: chat, session listing and session maintenance.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | /chat | [`chat_handler`] |
//! | GET | /previous-chats | [`previous_chats_handler`] |
//! | GET | /get-chat-history/{session_id} | [`chat_history_handler`] |
//! | GET | /start-new-session | [`start_new_session_handler`] |
//! | PUT, POST | /update-context | [`update_context_handler`] |
//! | DELETE | /delete-chat | [`delete_chat_handler`] |
//! | PUT | /rename-chat | [`rename_chat_handler`] |
//!
//! Failures are answered with `{"error": "..."}`. Engine and store details
//! are logged, never sent to the client.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use banter_agent::{ChatReply, ChatRequest};
use banter_core::session::{self, ChatMessage, SessionSummary};

use crate::SharedState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the `/api` router.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/previous-chats", get(previous_chats_handler))
        .route("/get-chat-history/{session_id}", get(chat_history_handler))
        .route("/start-new-session", get(start_new_session_handler))
        .route(
            "/update-context",
            put(update_context_handler).post(update_context_handler),
        )
        .route("/delete-chat", delete(delete_chat_handler))
        .route("/rename-chat", put(rename_chat_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<u64>,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.into(),
            changes: None,
        }
    }

    fn with_changes(message: &str, changes: u64) -> Self {
        Self {
            message: message.into(),
            changes: Some(changes),
        }
    }
}

/// Accepts both `context` and the older `newContext` field name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateContextRequest {
    #[serde(default, alias = "newContext", deserialize_with = "session::text_or_empty")]
    context: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteChatRequest {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameChatRequest {
    #[serde(default)]
    new_title: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Log `err` and answer 500 with a generic `message`.
fn server_error(message: &str, err: &dyn std::error::Error) -> ApiError {
    error!(error = %err, "{message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn rejected(rejection: JsonRejection) -> ApiError {
    bad_request(rejection.body_text())
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    let Json(request) = payload.map_err(rejected)?;

    match state.orchestrator.handle_chat(request).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) if e.is_client_error() => Err(bad_request(e.to_string())),
        Err(e) => Err(server_error("An error occurred", &e)),
    }
}

async fn previous_chats_handler(
    State(state): State<SharedState>,
) -> ApiResult<Vec<SessionSummary>> {
    state
        .store
        .list_latest_per_session()
        .await
        .map(Json)
        .map_err(|e| server_error("An error occurred while fetching previous chats.", &e))
}

async fn chat_history_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> ApiResult<Vec<ChatMessage>> {
    state
        .store
        .get_history(&session_id)
        .await
        .map(Json)
        .map_err(|e| server_error("An error occurred while fetching chat history.", &e))
}

/// Hands out a fresh id. The session is stored with its first message.
async fn start_new_session_handler() -> Json<NewSessionResponse> {
    Json(NewSessionResponse {
        session_id: session::new_session_id(),
    })
}

async fn update_context_handler(
    State(state): State<SharedState>,
    payload: Result<Json<UpdateContextRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload.map_err(rejected)?;
    let session_id =
        required(request.session_id).ok_or_else(|| bad_request("Missing required fields"))?;

    let changes = state
        .store
        .update_context(&session_id, &request.context)
        .await
        .map_err(|e| server_error("An error occurred while updating the context.", &e))?;

    Ok(Json(MessageResponse::with_changes(
        "Context updated successfully",
        changes,
    )))
}

async fn delete_chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<DeleteChatRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload.map_err(rejected)?;
    let session_id =
        required(request.session_id).ok_or_else(|| bad_request("Session ID is required"))?;

    let removed = state
        .store
        .delete_session(&session_id)
        .await
        .map_err(|e| server_error("An error occurred while deleting the chat.", &e))?;
    info!(session_id = %session_id, messages = removed, "Deleted session");

    Ok(Json(MessageResponse::new("Chat session deleted successfully")))
}

async fn rename_chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<RenameChatRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload.map_err(rejected)?;
    let (Some(new_title), Some(session_id)) =
        (required(request.new_title), required(request.session_id))
    else {
        return Err(bad_request("Missing required fields"));
    };

    let changes = state
        .store
        .rename_session(&session_id, &new_title)
        .await
        .map_err(|e| server_error("An error occurred while renaming the chat.", &e))?;

    Ok(Json(MessageResponse::with_changes(
        "Chat renamed successfully",
        changes,
    )))
}
