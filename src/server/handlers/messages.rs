use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::server::{config::AppState, error::SupportError, models::message::ThreadMessage};

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub messages: Vec<ThreadMessage>,
}

/// Registered-user thread fetch. Three shapes of the same query:
/// - a member reading support gets the full alias-set thread;
/// - staff reading a member's thread read the shared inbox (the member's
///   messages to any alias, and any alias member's replies);
/// - anything else is a plain pairwise thread.
pub async fn fetch_thread(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(counterpart_id): Path<Uuid>,
) -> Result<Json<ThreadResponse>, SupportError> {
    let viewer = state.auth.authenticate(&headers).await?;
    let aliases = state.alias.resolve().await;
    let limit = state.settings.thread_limit;

    let (messages, my_side) = if aliases.contains(&counterpart_id) {
        let messages = state.relay.fetch_thread(viewer.id, &aliases, limit).await?;
        (messages, vec![viewer.id])
    } else if viewer.is_staff() {
        let messages = state
            .relay
            .fetch_thread(counterpart_id, &aliases, limit)
            .await?;
        (messages, aliases)
    } else {
        let messages = state
            .relay
            .fetch_thread(viewer.id, &[counterpart_id], limit)
            .await?;
        (messages, vec![viewer.id])
    };

    Ok(Json(ThreadResponse {
        messages: messages
            .iter()
            .map(|m| ThreadMessage {
                id: m.id,
                content: m.content.clone(),
                is_me: my_side.contains(&m.sender_id),
                created_at: m.created_at,
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(counterpart_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, SupportError> {
    let viewer = state.auth.authenticate(&headers).await?;
    let message = state
        .relay
        .send(viewer.id, counterpart_id, &request.content)
        .await?;

    Ok(Json(SendMessageResponse {
        id: message.id,
        content: message.content,
        created_at: message.created_at,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

/// Resolves the support alias set when the caller is staff, so the count is
/// correct no matter which alias a historical message was addressed to.
pub async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UnreadCountResponse>, SupportError> {
    let viewer = state.auth.authenticate(&headers).await?;
    let unread_count = state.unread.count(&viewer).await?;

    Ok(Json(UnreadCountResponse { unread_count }))
}

#[derive(Debug, Serialize)]
pub struct MarkSeenResponse {
    pub marked: u64,
}

pub async fn mark_seen(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MarkSeenResponse>, SupportError> {
    let viewer = state.auth.authenticate(&headers).await?;
    let marked = state.unread.mark_seen(&viewer).await?;

    Ok(Json(MarkSeenResponse { marked }))
}
