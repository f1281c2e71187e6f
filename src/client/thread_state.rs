use chrono::{DateTime, Utc};

use crate::server::models::message::ThreadMessage;

/// A message shown immediately on send, before server confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub content: String,
    pub queued_at: DateTime<Utc>,
}

/// Two-phase local thread: confirmed messages from the last snapshot plus
/// optimistic pending entries. Snapshots replace the confirmed list
/// wholesale, never merged or patched, so out-of-order poll completions
/// cannot corrupt ordering. A pending entry may briefly coexist with its
/// confirmed copy; that duplicate lasts at most one poll interval.
#[derive(Debug, Default)]
pub struct ThreadState {
    confirmed: Vec<ThreadMessage>,
    pending: Vec<PendingMessage>,
}

impl ThreadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an optimistic send for immediate display.
    pub fn push_pending(&mut self, content: impl Into<String>) {
        self.pending.push(PendingMessage {
            content: content.into(),
            queued_at: Utc::now(),
        });
    }

    /// Replaces the confirmed list with an authoritative snapshot and drops
    /// all pending entries (the snapshot is the reconciliation). Returns
    /// whether the visible thread changed.
    pub fn apply_snapshot(&mut self, snapshot: Vec<ThreadMessage>) -> bool {
        let changed = self.confirmed != snapshot || !self.pending.is_empty();
        self.confirmed = snapshot;
        self.pending.clear();
        changed
    }

    pub fn confirmed(&self) -> &[ThreadMessage] {
        &self.confirmed
    }

    pub fn pending(&self) -> &[PendingMessage] {
        &self.pending
    }

    /// Number of confirmed staff messages; feeds the guest read watermark.
    pub fn staff_message_count(&self) -> u64 {
        self.confirmed.iter().filter(|m| !m.is_me).count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn msg(content: &str, is_me: bool) -> ThreadMessage {
        ThreadMessage {
            id: Uuid::new_v4(),
            content: content.to_string(),
            is_me,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_replaces_wholesale_and_clears_pending() {
        let mut state = ThreadState::new();
        state.push_pending("hello");
        assert_eq!(state.pending().len(), 1);

        let snapshot = vec![msg("hello", true), msg("hi there", false)];
        assert!(state.apply_snapshot(snapshot.clone()));
        assert_eq!(state.confirmed(), snapshot.as_slice());
        assert!(state.pending().is_empty());

        // Identical snapshot with nothing pending: no UI churn.
        assert!(!state.apply_snapshot(snapshot));
    }

    #[test]
    fn pending_forces_a_change_notification() {
        let mut state = ThreadState::new();
        let snapshot = vec![msg("hello", true)];
        state.apply_snapshot(snapshot.clone());

        state.push_pending("second");
        // Even an unchanged snapshot must repaint to absorb the pending row.
        assert!(state.apply_snapshot(snapshot));
    }

    #[test]
    fn staff_count_ignores_own_messages() {
        let mut state = ThreadState::new();
        state.apply_snapshot(vec![
            msg("mine", true),
            msg("staff 1", false),
            msg("staff 2", false),
        ]);
        assert_eq!(state.staff_message_count(), 2);
    }
}
