use std::sync::Arc;

use uuid::Uuid;

use crate::server::{error::SupportError, models::identity::Identity};

use super::{alias::SupportAliasService, store::SupportStore};

/// Server-side unread accounting. Staff counts are authoritative (`read`
/// flags over the whole alias set); regular members count only their own
/// inbox. The guest side uses a client-local watermark instead (see
/// `client::credentials`); that asymmetry is deliberate.
pub struct UnreadAccounting {
    store: Arc<dyn SupportStore>,
    alias: Arc<SupportAliasService>,
}

impl UnreadAccounting {
    pub fn new(store: Arc<dyn SupportStore>, alias: Arc<SupportAliasService>) -> Self {
        Self { store, alias }
    }

    async fn receiver_set(&self, viewer: &Identity) -> Vec<Uuid> {
        if viewer.is_staff() {
            self.alias.resolve().await
        } else {
            vec![viewer.id]
        }
    }

    pub async fn count(&self, viewer: &Identity) -> Result<i64, SupportError> {
        let receivers = self.receiver_set(viewer).await;
        Ok(self.store.unread_count(&receivers).await?)
    }

    /// Flips `read` on everything currently unread for the viewer's
    /// receiver set. Idempotent: a second call marks nothing.
    pub async fn mark_seen(&self, viewer: &Identity) -> Result<u64, SupportError> {
        let receivers = self.receiver_set(viewer).await;
        Ok(self.store.mark_read(&receivers).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::models::identity::{IdentityKind, NewIdentity, Role};
    use crate::server::services::memory_store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        unread: UnreadAccounting,
        owner: Identity,
        system: Identity,
        legacy: Identity,
        guest: Identity,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = store
            .create_identity(NewIdentity {
                id: None,
                kind: IdentityKind::User,
                role: Role::Owner,
                display_name: "Owner".into(),
                email: None,
            })
            .await
            .unwrap();
        let system = store
            .create_identity(NewIdentity {
                id: None,
                kind: IdentityKind::System,
                role: Role::Admin,
                display_name: "Support".into(),
                email: Some("support@sakina.app".into()),
            })
            .await
            .unwrap();
        let legacy = store
            .create_identity(NewIdentity {
                id: None,
                kind: IdentityKind::System,
                role: Role::Admin,
                display_name: "Legacy".into(),
                email: None,
            })
            .await
            .unwrap();
        let guest = store
            .create_identity(NewIdentity::guest("Layla"))
            .await
            .unwrap();

        let alias = Arc::new(SupportAliasService::new(
            store.clone(),
            owner.id,
            "support@sakina.app".into(),
            legacy.id,
        ));
        let unread = UnreadAccounting::new(store.clone(), alias);

        Fixture {
            store,
            unread,
            owner,
            system,
            legacy,
            guest,
        }
    }

    #[tokio::test]
    async fn staff_count_spans_all_alias_members() {
        let f = fixture().await;
        // Three messages addressed to three different support aliases.
        f.store
            .insert_message(f.guest.id, f.owner.id, "to owner")
            .await
            .unwrap();
        f.store
            .insert_message(f.guest.id, f.system.id, "to system")
            .await
            .unwrap();
        f.store
            .insert_message(f.guest.id, f.legacy.id, "to legacy")
            .await
            .unwrap();

        assert_eq!(f.unread.count(&f.owner).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn mark_seen_zeroes_the_count_and_is_idempotent() {
        let f = fixture().await;
        f.store
            .insert_message(f.guest.id, f.owner.id, "one")
            .await
            .unwrap();
        f.store
            .insert_message(f.guest.id, f.legacy.id, "two")
            .await
            .unwrap();

        assert_eq!(f.unread.mark_seen(&f.owner).await.unwrap(), 2);
        assert_eq!(f.unread.count(&f.owner).await.unwrap(), 0);
        assert_eq!(f.unread.mark_seen(&f.owner).await.unwrap(), 0);

        // Stays zero until a new alias-addressed message arrives.
        f.store
            .insert_message(f.guest.id, f.system.id, "three")
            .await
            .unwrap();
        assert_eq!(f.unread.count(&f.owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn members_only_count_their_own_inbox() {
        let f = fixture().await;
        f.store
            .insert_message(f.owner.id, f.guest.id, "reply")
            .await
            .unwrap();
        f.store
            .insert_message(f.guest.id, f.owner.id, "question")
            .await
            .unwrap();

        assert_eq!(f.unread.count(&f.guest).await.unwrap(), 1);
        f.unread.mark_seen(&f.guest).await.unwrap();
        assert_eq!(f.unread.count(&f.guest).await.unwrap(), 0);
        // The guest's mark-seen does not consume the staff inbox.
        assert_eq!(f.unread.count(&f.owner).await.unwrap(), 1);
    }
}
