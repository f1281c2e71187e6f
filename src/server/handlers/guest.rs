use axum::{
    extract::{Json, State},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::server::{
    config::AppState,
    error::SupportError,
    models::message::ThreadMessage,
    services::{auth::bearer_token, relay::validate_content},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestMessageRequest {
    pub name: String,
    pub message: String,
    pub guest_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestMessageResponse {
    pub token: String,
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Establishes or continues a guest identity and appends a message to the
/// support thread. The returned token is the credential for every later
/// request from this visitor.
pub async fn guest_message(
    State(state): State<AppState>,
    Json(request): Json<GuestMessageRequest>,
) -> Result<Json<GuestMessageResponse>, SupportError> {
    // Reject blank content before creating any identity.
    validate_content(&request.message)?;

    let resolved = state
        .guests
        .resolve_or_create(request.guest_token.as_deref(), &request.name)
        .await?;

    // Guest messages are addressed to the configured owner inbox; the alias
    // set reunifies them with legacy/system-addressed history on read.
    let message = state
        .relay
        .send(resolved.identity_id, state.alias.owner_id(), &request.message)
        .await?;

    if resolved.created {
        info!("guest thread opened by {}", resolved.identity_id);
    }

    Ok(Json(GuestMessageResponse {
        token: resolved.token,
        id: message.id,
        content: message.content,
        created_at: message.created_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct GuestThreadResponse {
    pub messages: Vec<ThreadMessage>,
}

/// Full support thread for the guest holding the bearer token, regardless
/// of which alias member staff replied from.
pub async fn guest_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GuestThreadResponse>, SupportError> {
    let token = bearer_token(&headers)?;
    let guest = state
        .store
        .find_guest_by_token(token)
        .await?
        .filter(|g| g.merged_into.is_none())
        .ok_or(SupportError::InvalidCredential)?;

    let aliases = state.alias.resolve().await;
    let messages = state
        .relay
        .fetch_thread(guest.identity_id, &aliases, state.settings.thread_limit)
        .await?;

    Ok(Json(GuestThreadResponse {
        messages: messages
            .iter()
            .map(|m| ThreadMessage::from_message(m, guest.identity_id))
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestMergeRequest {
    pub guest_token: String,
}

#[derive(Debug, Serialize)]
pub struct GuestMergeResponse {
    pub migrated: u64,
}

/// Called once the visitor registers: migrates the guest thread into the
/// authenticated account. The client clears its stored credential on
/// success.
pub async fn guest_merge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GuestMergeRequest>,
) -> Result<Json<GuestMergeResponse>, SupportError> {
    let viewer = state.auth.authenticate(&headers).await?;
    let migrated = state
        .guests
        .merge_into_account(&request.guest_token, viewer.id)
        .await?;

    Ok(Json(GuestMergeResponse { migrated }))
}
