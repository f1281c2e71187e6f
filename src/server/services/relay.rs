use std::sync::Arc;

use uuid::Uuid;

use crate::server::{error::SupportError, models::message::Message};

use super::store::SupportStore;

pub const DEFAULT_THREAD_LIMIT: i64 = 200;

/// Appends messages to a thread and retrieves thread history for a given
/// counterpart or counterpart set.
pub struct MessageRelay {
    store: Arc<dyn SupportStore>,
}

/// The handler boundary rejects blank content before any identity gets
/// created; the relay enforces the same rule for in-process callers.
pub fn validate_content(content: &str) -> Result<&str, SupportError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SupportError::EmptyMessage);
    }
    Ok(trimmed)
}

impl MessageRelay {
    pub fn new(store: Arc<dyn SupportStore>) -> Self {
        Self { store }
    }

    pub async fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<Message, SupportError> {
        let content = validate_content(content)?;
        if sender_id == receiver_id {
            return Err(SupportError::SelfAddressed);
        }
        if self.store.find_identity(sender_id).await?.is_none()
            || self.store.find_identity(receiver_id).await?.is_none()
        {
            return Err(SupportError::UnknownIdentity);
        }

        Ok(self.store.insert_message(sender_id, receiver_id, content).await?)
    }

    /// Full bidirectional thread between `viewer` and any member of
    /// `counterparts`, regardless of which alias a historical message used.
    /// Reads have no side effects; read-marking is a separate action.
    pub async fn fetch_thread(
        &self,
        viewer: Uuid,
        counterparts: &[Uuid],
        limit: i64,
    ) -> Result<Vec<Message>, SupportError> {
        Ok(self.store.thread(viewer, counterparts, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::models::identity::NewIdentity;
    use crate::server::services::memory_store::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, MessageRelay, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let a = store
            .create_identity(NewIdentity::user("A", None))
            .await
            .unwrap();
        let b = store
            .create_identity(NewIdentity::user("B", None))
            .await
            .unwrap();
        let relay = MessageRelay::new(store.clone());
        (store, relay, a.id, b.id)
    }

    #[tokio::test]
    async fn empty_and_whitespace_sends_are_rejected_without_a_row() {
        let (store, relay, a, b) = setup().await;

        assert!(matches!(
            relay.send(a, b, "").await,
            Err(SupportError::EmptyMessage)
        ));
        assert!(matches!(
            relay.send(a, b, "   ").await,
            Err(SupportError::EmptyMessage)
        ));
        assert!(store.thread(a, &[b], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn self_addressed_send_is_rejected() {
        let (_, relay, a, _) = setup().await;
        assert!(matches!(
            relay.send(a, a, "hi").await,
            Err(SupportError::SelfAddressed)
        ));
    }

    #[tokio::test]
    async fn unknown_endpoint_is_rejected() {
        let (_, relay, a, _) = setup().await;
        assert!(matches!(
            relay.send(a, Uuid::new_v4(), "hi").await,
            Err(SupportError::UnknownIdentity)
        ));
    }

    #[tokio::test]
    async fn content_is_stored_trimmed() {
        let (_, relay, a, b) = setup().await;
        let message = relay.send(a, b, "  مرحباً  ").await.unwrap();
        assert_eq!(message.content, "مرحباً");
        assert!(!message.read);
    }
}
