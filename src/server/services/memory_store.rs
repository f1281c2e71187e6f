use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::server::models::{
    identity::{GuestIdentity, Identity, NewIdentity},
    message::{ConversationSummary, Message},
};

use super::store::SupportStore;

#[derive(Default)]
struct Inner {
    identities: HashMap<Uuid, Identity>,
    /// Guest token -> guest record. Insertion order of `messages` is the
    /// stable tie-break for equal timestamps.
    guests: HashMap<String, GuestIdentity>,
    sessions: HashMap<String, Uuid>,
    messages: Vec<Message>,
}

/// In-memory `SupportStore`. Backs the test suite and doubles as a working
/// store for single-process embedding.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_thread(message: &Message, a: Uuid, b: &[Uuid]) -> bool {
    (message.sender_id == a && b.contains(&message.receiver_id))
        || (b.contains(&message.sender_id) && message.receiver_id == a)
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn create_identity(&self, new: NewIdentity) -> Result<Identity> {
        let identity = Identity {
            id: new.id.unwrap_or_else(Uuid::new_v4),
            kind: new.kind,
            role: new.role,
            display_name: new.display_name,
            email: new.email,
            created_at: Utc::now(),
        };
        self.inner
            .write()
            .await
            .identities
            .insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>> {
        Ok(self.inner.read().await.identities.get(&id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        Ok(self
            .inner
            .read()
            .await
            .identities
            .values()
            .find(|i| i.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_guest(&self, token: &str, display_name: &str) -> Result<GuestIdentity> {
        let identity = self
            .create_identity(NewIdentity::guest(display_name))
            .await?;
        let guest = GuestIdentity {
            identity_id: identity.id,
            token: token.to_string(),
            display_name: display_name.to_string(),
            created_at: identity.created_at,
            merged_into: None,
        };
        self.inner
            .write()
            .await
            .guests
            .insert(token.to_string(), guest.clone());
        Ok(guest)
    }

    async fn find_guest_by_token(&self, token: &str) -> Result<Option<GuestIdentity>> {
        Ok(self.inner.read().await.guests.get(token).cloned())
    }

    async fn rename_guest(&self, identity_id: Uuid, display_name: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(guest) = inner
            .guests
            .values_mut()
            .find(|g| g.identity_id == identity_id)
        {
            guest.display_name = display_name.to_string();
        }
        if let Some(identity) = inner.identities.get_mut(&identity_id) {
            identity.display_name = display_name.to_string();
        }
        Ok(())
    }

    async fn merge_guest(&self, identity_id: Uuid, user_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut migrated = 0u64;
        for message in inner.messages.iter_mut() {
            if message.sender_id == identity_id {
                message.sender_id = user_id;
                migrated += 1;
            } else if message.receiver_id == identity_id {
                message.receiver_id = user_id;
                migrated += 1;
            }
        }
        if let Some(guest) = inner
            .guests
            .values_mut()
            .find(|g| g.identity_id == identity_id)
        {
            guest.merged_into = Some(user_id);
        }
        Ok(migrated)
    }

    async fn purge_stale_guests(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;

        let stale: Vec<(String, Uuid, bool)> = inner
            .guests
            .iter()
            .filter_map(|(token, guest)| {
                let merged = guest.merged_into.is_some();
                let last_activity = inner
                    .messages
                    .iter()
                    .filter(|m| {
                        m.sender_id == guest.identity_id || m.receiver_id == guest.identity_id
                    })
                    .map(|m| m.created_at)
                    .max()
                    .unwrap_or(guest.created_at);
                (last_activity < cutoff).then(|| (token.clone(), guest.identity_id, merged))
            })
            .collect();

        for (token, identity_id, merged) in &stale {
            inner.guests.remove(token);
            // A merged tombstone's messages already belong to the account.
            if !merged {
                inner.identities.remove(identity_id);
                inner
                    .messages
                    .retain(|m| m.sender_id != *identity_id && m.receiver_id != *identity_id);
            }
        }

        Ok(stale.len() as u64)
    }

    async fn insert_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content: content.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        self.inner.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn thread(&self, a: Uuid, b: &[Uuid], limit: i64) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| in_thread(m, a, b))
            .cloned()
            .collect();
        // Vec order is insertion order; the stable sort keeps it for ties.
        messages.sort_by_key(|m| m.created_at);
        let limit = limit.max(0) as usize;
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }

    async fn unread_count(&self, receivers: &[Uuid]) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| !m.read && receivers.contains(&m.receiver_id))
            .count() as i64)
    }

    async fn mark_read(&self, receivers: &[Uuid]) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let mut marked = 0u64;
        for message in inner.messages.iter_mut() {
            if !message.read && receivers.contains(&message.receiver_id) {
                message.read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn delete_thread(&self, a: Uuid, b: &[Uuid]) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.messages.len();
        inner.messages.retain(|m| !in_thread(m, a, b));
        Ok((before - inner.messages.len()) as u64)
    }

    async fn create_session(&self, token: &str, identity_id: Uuid) -> Result<()> {
        self.inner
            .write()
            .await
            .sessions
            .insert(token.to_string(), identity_id);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Identity>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(token)
            .and_then(|id| inner.identities.get(id))
            .cloned())
    }

    async fn support_conversations(&self, aliases: &[Uuid]) -> Result<Vec<ConversationSummary>> {
        let inner = self.inner.read().await;
        let mut by_counterpart: HashMap<Uuid, (i64, i64, DateTime<Utc>)> = HashMap::new();

        for message in &inner.messages {
            let sender_is_alias = aliases.contains(&message.sender_id);
            let receiver_is_alias = aliases.contains(&message.receiver_id);
            // Exactly one endpoint on the support side; skip intra-staff
            // traffic and unrelated pairs.
            let counterpart = match (sender_is_alias, receiver_is_alias) {
                (true, false) => message.receiver_id,
                (false, true) => message.sender_id,
                _ => continue,
            };
            let entry = by_counterpart
                .entry(counterpart)
                .or_insert((0, 0, message.created_at));
            entry.0 += 1;
            if receiver_is_alias && !message.read {
                entry.1 += 1;
            }
            if message.created_at > entry.2 {
                entry.2 = message.created_at;
            }
        }

        let mut summaries: Vec<ConversationSummary> = by_counterpart
            .into_iter()
            .filter_map(|(counterpart_id, (count, unread, last_at))| {
                inner
                    .identities
                    .get(&counterpart_id)
                    .map(|identity| ConversationSummary {
                        counterpart_id,
                        display_name: identity.display_name.clone(),
                        kind: identity.kind,
                        message_count: count,
                        unread_count: unread,
                        last_message_at: last_at,
                    })
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::models::identity::{IdentityKind, Role};

    async fn identity(store: &MemoryStore, role: Role) -> Identity {
        store
            .create_identity(NewIdentity {
                id: None,
                kind: IdentityKind::User,
                role,
                display_name: "someone".into(),
                email: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn thread_is_bidirectional_across_alias_members() {
        let store = MemoryStore::new();
        let guest = identity(&store, Role::Member).await;
        let owner = identity(&store, Role::Owner).await;
        let legacy = identity(&store, Role::Owner).await;

        store
            .insert_message(guest.id, owner.id, "to owner")
            .await
            .unwrap();
        store
            .insert_message(guest.id, legacy.id, "to legacy")
            .await
            .unwrap();
        store
            .insert_message(legacy.id, guest.id, "reply from legacy")
            .await
            .unwrap();

        let thread = store
            .thread(guest.id, &[owner.id, legacy.id], 100)
            .await
            .unwrap();
        assert_eq!(thread.len(), 3);
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["to owner", "to legacy", "reply from legacy"]);
    }

    #[tokio::test]
    async fn thread_limit_keeps_most_recent_ascending() {
        let store = MemoryStore::new();
        let a = identity(&store, Role::Member).await;
        let b = identity(&store, Role::Owner).await;
        for i in 0..5 {
            store
                .insert_message(a.id, b.id, &format!("m{}", i))
                .await
                .unwrap();
        }

        let thread = store.thread(a.id, &[b.id], 2).await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_insertion_order() {
        let store = MemoryStore::new();
        let a = identity(&store, Role::Member).await;
        let b = identity(&store, Role::Owner).await;

        // Bypass insert_message to force one shared timestamp.
        let at = Utc::now();
        {
            let mut inner = store.inner.write().await;
            for (sender, receiver, content) in
                [(a.id, b.id, "m0"), (b.id, a.id, "m1"), (a.id, b.id, "m2")]
            {
                inner.messages.push(Message {
                    id: Uuid::new_v4(),
                    sender_id: sender,
                    receiver_id: receiver,
                    content: content.to_string(),
                    read: false,
                    created_at: at,
                });
            }
        }

        let thread = store.thread(a.id, &[b.id], 10).await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2"]);

        // The limit window also honors insertion order within the tie.
        let thread = store.thread(a.id, &[b.id], 2).await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn purge_removes_idle_guests_only() {
        let store = MemoryStore::new();
        let owner = identity(&store, Role::Owner).await;
        let idle = store.create_guest("tok-idle", "Idle").await.unwrap();
        let active = store.create_guest("tok-active", "Active").await.unwrap();
        store
            .insert_message(active.identity_id, owner.id, "hi")
            .await
            .unwrap();

        // A cutoff in the past purges nothing.
        let purged = store
            .purge_stale_guests(Utc::now() - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(purged, 0);

        // A cutoff past all activity purges both guests and their messages.
        let purged = store
            .purge_stale_guests(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 2);
        assert!(store.find_guest_by_token("tok-idle").await.unwrap().is_none());
        assert!(store
            .find_identity(idle.identity_id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store.thread(active.identity_id, &[owner.id], 10).await.unwrap().len(),
            0
        );
    }
}
