use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::IdentityKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A message as the widget renders it: sidedness instead of raw ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub id: Uuid,
    pub content: String,
    pub is_me: bool,
    pub created_at: DateTime<Utc>,
}

impl ThreadMessage {
    pub fn from_message(message: &Message, viewer_id: Uuid) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            is_me: message.sender_id == viewer_id,
            created_at: message.created_at,
        }
    }
}

/// One row of the staff monitoring view: a counterpart that has exchanged
/// messages with the support inbox.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub counterpart_id: Uuid,
    pub display_name: String,
    pub kind: IdentityKind,
    pub message_count: i64,
    pub unread_count: i64,
    pub last_message_at: DateTime<Utc>,
}
