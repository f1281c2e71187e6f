use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::server::models::{
    identity::{GuestIdentity, Identity, NewIdentity},
    message::{ConversationSummary, Message},
};

/// Storage seam for the support-messaging core. Production runs on Postgres
/// (`PgStore`); tests and embedded use run on `MemoryStore`.
#[async_trait]
pub trait SupportStore: Send + Sync {
    async fn create_identity(&self, new: NewIdentity) -> Result<Identity>;
    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>>;
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>>;

    async fn create_guest(&self, token: &str, display_name: &str) -> Result<GuestIdentity>;
    async fn find_guest_by_token(&self, token: &str) -> Result<Option<GuestIdentity>>;
    async fn rename_guest(&self, identity_id: Uuid, display_name: &str) -> Result<()>;
    /// Repoints every message endpoint from the guest identity to the
    /// registered account and tombstones the guest row. Returns the number
    /// of messages migrated.
    async fn merge_guest(&self, identity_id: Uuid, user_id: Uuid) -> Result<u64>;
    /// Removes guest identities (and their messages) with no activity since
    /// `cutoff`, plus merged tombstones older than it.
    async fn purge_stale_guests(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<Message>;
    /// Bidirectional thread between `a` and any member of `b`, ascending by
    /// `created_at` with insertion order breaking ties. `limit` keeps the
    /// most recent messages.
    async fn thread(&self, a: Uuid, b: &[Uuid], limit: i64) -> Result<Vec<Message>>;
    async fn unread_count(&self, receivers: &[Uuid]) -> Result<i64>;
    async fn mark_read(&self, receivers: &[Uuid]) -> Result<u64>;
    async fn delete_thread(&self, a: Uuid, b: &[Uuid]) -> Result<u64>;

    async fn create_session(&self, token: &str, identity_id: Uuid) -> Result<()>;
    async fn find_session(&self, token: &str) -> Result<Option<Identity>>;

    async fn support_conversations(&self, aliases: &[Uuid]) -> Result<Vec<ConversationSummary>>;
}
