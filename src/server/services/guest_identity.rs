use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::server::error::SupportError;

use super::store::SupportStore;

/// Maps a bearer credential to a stable pseudo-user record, creating one on
/// first use, and migrates the record into a registered account on signup.
pub struct GuestIdentityService {
    store: Arc<dyn SupportStore>,
}

#[derive(Debug, Clone)]
pub struct ResolvedGuest {
    pub token: String,
    pub identity_id: Uuid,
    pub created: bool,
}

impl GuestIdentityService {
    pub fn new(store: Arc<dyn SupportStore>) -> Self {
        Self { store }
    }

    /// No token (or an empty one) always creates a fresh identity; two
    /// near-simultaneous tokenless sends produce two identities by design,
    /// since the client persists the returned token immediately. A non-empty
    /// token that no longer resolves is the caller's cue to start over.
    pub async fn resolve_or_create(
        &self,
        token: Option<&str>,
        display_name: &str,
    ) -> Result<ResolvedGuest, SupportError> {
        let display_name = display_name.trim();
        let display_name = if display_name.is_empty() {
            "Guest"
        } else {
            display_name
        };

        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let guest = self
                .store
                .find_guest_by_token(token)
                .await?
                .filter(|g| g.merged_into.is_none())
                .ok_or(SupportError::InvalidCredential)?;

            // Name updates are allowed; identity continuity survives them.
            if guest.display_name != display_name {
                self.store
                    .rename_guest(guest.identity_id, display_name)
                    .await?;
            }

            return Ok(ResolvedGuest {
                token: token.to_string(),
                identity_id: guest.identity_id,
                created: false,
            });
        }

        let token = Uuid::new_v4().to_string();
        let guest = self.store.create_guest(&token, display_name).await?;
        info!("created guest identity {}", guest.identity_id);

        Ok(ResolvedGuest {
            token,
            identity_id: guest.identity_id,
            created: true,
        })
    }

    /// Scenario: the visitor registers while holding a guest token. History
    /// migrates to the account; the guest row becomes a tombstone. Merging
    /// the same token into the same account again is a no-op.
    pub async fn merge_into_account(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> Result<u64, SupportError> {
        let guest = self
            .store
            .find_guest_by_token(token)
            .await?
            .ok_or(SupportError::InvalidCredential)?;

        match guest.merged_into {
            Some(existing) if existing == user_id => return Ok(0),
            Some(_) => return Err(SupportError::InvalidCredential),
            None => {}
        }

        if self.store.find_identity(user_id).await?.is_none() {
            return Err(SupportError::UnknownIdentity);
        }

        // A counterpart of the guest's own thread cannot claim it: repointing
        // would fold those messages onto themselves.
        if !self
            .store
            .thread(guest.identity_id, &[user_id], 1)
            .await?
            .is_empty()
        {
            return Err(SupportError::SelfAddressed);
        }

        let migrated = self.store.merge_guest(guest.identity_id, user_id).await?;
        info!(
            "merged guest {} into account {} ({} messages)",
            guest.identity_id, user_id, migrated
        );
        Ok(migrated)
    }
}
