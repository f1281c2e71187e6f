use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::store::SupportStore;

/// Resolves "support" to the set of receiver identities that all alias the
/// support inbox: the configured owner, the system account found by its
/// well-known email, and one legacy identity kept as configuration because
/// historical messages were addressed to it directly.
///
/// Every path that needs the set (send, thread fetch, unread accounting,
/// admin views, deletion) goes through this one resolver.
pub struct SupportAliasService {
    store: Arc<dyn SupportStore>,
    owner_id: Uuid,
    support_email: String,
    legacy_alias_id: Uuid,
}

impl SupportAliasService {
    pub fn new(
        store: Arc<dyn SupportStore>,
        owner_id: Uuid,
        support_email: String,
        legacy_alias_id: Uuid,
    ) -> Self {
        Self {
            store,
            owner_id,
            support_email,
            legacy_alias_id,
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// Recomputed per request, never persisted. Fails open: a failed or
    /// empty system-account lookup shrinks the set instead of erroring, so
    /// delivery and unread counts degrade rather than block.
    pub async fn resolve(&self) -> Vec<Uuid> {
        let mut set = vec![self.owner_id];
        if !set.contains(&self.legacy_alias_id) {
            set.push(self.legacy_alias_id);
        }

        match self.store.find_identity_by_email(&self.support_email).await {
            Ok(Some(system)) => {
                if !set.contains(&system.id) {
                    set.push(system.id);
                }
            }
            Ok(None) => {
                debug!("no system account registered for {}", self.support_email);
            }
            Err(e) => {
                warn!("support alias lookup degraded: {}", e);
            }
        }

        set
    }
}
