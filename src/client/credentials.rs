use std::collections::HashMap;
use std::sync::Mutex;

pub const GUEST_TOKEN_KEY: &str = "support.guest_token";
pub const GUEST_NAME_KEY: &str = "support.guest_name";
pub const LAST_SEEN_KEY: &str = "support.last_seen_count";

/// Key/value persistence scoped to one browser/device. Injected rather than
/// ambient so tests (and non-browser hosts) substitute an in-memory store.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

/// Typed view over the guest's persisted state: bearer token, display name,
/// and the read watermark.
///
/// The guest-side unread count is advisory and UI-only: with no server-side
/// read flag available to an anonymous visitor, unread is the number of
/// staff messages past a locally persisted watermark. Staff counts use the
/// authoritative server flags instead; the asymmetry is intentional.
pub struct GuestCredentials<S: CredentialStore> {
    store: S,
}

impl<S: CredentialStore> GuestCredentials<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(GUEST_TOKEN_KEY)
    }

    pub fn remember_token(&self, token: &str) {
        self.store.set(GUEST_TOKEN_KEY, token);
    }

    pub fn display_name(&self) -> Option<String> {
        self.store.get(GUEST_NAME_KEY)
    }

    pub fn remember_name(&self, name: &str) {
        self.store.set(GUEST_NAME_KEY, name);
    }

    pub fn last_seen(&self) -> u64 {
        self.store
            .get(LAST_SEEN_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0)
    }

    /// Advisory unread count for the widget badge.
    pub fn unread(&self, staff_total: u64) -> u64 {
        staff_total.saturating_sub(self.last_seen())
    }

    /// Raises the watermark to the current staff-message total. The
    /// watermark never decreases, so a stale total is a no-op.
    pub fn mark_seen(&self, staff_total: u64) {
        if staff_total > self.last_seen() {
            self.store.set(LAST_SEEN_KEY, &staff_total.to_string());
        }
    }

    /// Called on successful registration/login: the guest credential has
    /// been merged server-side and must not be presented again.
    pub fn clear(&self) {
        self.store.remove(GUEST_TOKEN_KEY);
        self.store.remove(GUEST_NAME_KEY);
        self.store.remove(LAST_SEEN_KEY);
    }
}
