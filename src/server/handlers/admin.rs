use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::server::{
    config::AppState,
    error::SupportError,
    models::message::{ConversationSummary, Message},
};

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// Staff monitoring view: everyone who has exchanged messages with the
/// support inbox, most recent activity first.
pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConversationsResponse>, SupportError> {
    state.auth.require_staff(&headers).await?;
    let aliases = state.alias.resolve().await;
    let conversations = state.store.support_conversations(&aliases).await?;

    Ok(Json(ConversationsResponse { conversations }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMessagesQuery {
    pub participant_a: Uuid,
    pub participant_b: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AdminMessagesResponse {
    pub messages: Vec<Message>,
}

/// Raw thread between two arbitrary identities. A support-alias participant
/// expands to the whole alias set so the monitored thread is complete.
pub async fn admin_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminMessagesQuery>,
) -> Result<Json<AdminMessagesResponse>, SupportError> {
    state.auth.require_staff(&headers).await?;
    let aliases = state.alias.resolve().await;

    let (a, set) = if aliases.contains(&query.participant_a) {
        (query.participant_b, aliases)
    } else if aliases.contains(&query.participant_b) {
        (query.participant_a, aliases)
    } else {
        (query.participant_a, vec![query.participant_b])
    };

    let messages = state
        .relay
        .fetch_thread(a, &set, state.settings.thread_limit)
        .await?;

    Ok(Json(AdminMessagesResponse { messages }))
}

#[derive(Debug, Serialize)]
pub struct DeleteConversationResponse {
    pub removed: u64,
}

/// Removes the support thread of the given identity. Messages are otherwise
/// never deleted; this is the explicit administrative exception.
pub async fn delete_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(identity_id): Path<Uuid>,
) -> Result<Json<DeleteConversationResponse>, SupportError> {
    let staff = state.auth.require_staff(&headers).await?;
    let aliases = state.alias.resolve().await;
    let removed = state.store.delete_thread(identity_id, &aliases).await?;
    info!(
        "{} deleted support conversation of {} ({} messages)",
        staff.id, identity_id, removed
    );

    Ok(Json(DeleteConversationResponse { removed }))
}
