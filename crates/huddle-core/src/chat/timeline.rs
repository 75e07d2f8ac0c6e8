//! Message timeline with optimistic entries.
//!
//! Every entry is either `Pending` (inserted locally, carrying a temporary
//! id) or `Confirmed` (carrying the server id). All transitions between the
//! two go through [`MessageTimeline::confirm`] and [`MessageTimeline::fail`];
//! realtime events go through [`MessageTimeline::ingest`], which is
//! idempotent on the server id.

use super::model::Message;
use crate::workspace::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

const TEMP_ID_PREFIX: &str = "temp-";

/// Lifecycle state of a timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntryState {
    Pending { temp_id: String },
    Confirmed { server_id: String },
}

/// Display information about a message sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<&Profile> for SenderInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// One message as shown in the conversation view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub state: EntryState,
    pub conversation_id: String,
    pub sender: SenderInfo,
    pub content: String,
    /// Client clock for pending entries, server clock once confirmed.
    pub created_at: DateTime<Utc>,
    pub read_by: BTreeSet<String>,
}

impl MessageEntry {
    /// Builds an optimistic entry with a fresh temporary id.
    pub fn pending(
        conversation_id: impl Into<String>,
        sender: SenderInfo,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut read_by = BTreeSet::new();
        read_by.insert(sender.user_id.clone());
        Self {
            state: EntryState::Pending {
                temp_id: format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()),
            },
            conversation_id: conversation_id.into(),
            sender,
            content: content.into(),
            created_at: now,
            read_by,
        }
    }

    /// Builds a confirmed entry from a persisted message.
    pub fn confirmed(message: Message, sender: SenderInfo) -> Self {
        let mut read_by: BTreeSet<String> = message.read_by.into_iter().collect();
        read_by.insert(message.sender_id);
        Self {
            state: EntryState::Confirmed {
                server_id: message.id,
            },
            conversation_id: message.conversation_id,
            sender,
            content: message.content,
            created_at: message.created_at,
            read_by,
        }
    }

    pub fn temp_id(&self) -> Option<&str> {
        match &self.state {
            EntryState::Pending { temp_id } => Some(temp_id),
            EntryState::Confirmed { .. } => None,
        }
    }

    pub fn server_id(&self) -> Option<&str> {
        match &self.state {
            EntryState::Confirmed { server_id } => Some(server_id),
            EntryState::Pending { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Pending { .. })
    }

    /// The id the view keys the entry by.
    pub fn key(&self) -> &str {
        match &self.state {
            EntryState::Pending { temp_id } => temp_id,
            EntryState::Confirmed { server_id } => server_id,
        }
    }
}

/// Whether `id` is a client-generated temporary id.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Outcome of confirming a pending entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The pending entry became the confirmed one.
    Replaced,
    /// The realtime echo already delivered the confirmed message; the pending
    /// entry was dropped.
    DroppedDuplicate,
    /// No pending entry with that temporary id exists any more.
    Missing,
}

/// Ordered list of messages for one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageTimeline {
    entries: Vec<MessageEntry>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a timeline from fetched entries.
    pub fn from_entries(entries: Vec<MessageEntry>) -> Self {
        let mut timeline = Self { entries };
        timeline.sort();
        timeline
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains_server_id(&self, server_id: &str) -> bool {
        self.entries.iter().any(|e| e.server_id() == Some(server_id))
    }

    pub fn find_by_server_id(&self, server_id: &str) -> Option<&MessageEntry> {
        self.entries.iter().find(|e| e.server_id() == Some(server_id))
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Appends an optimistic entry and returns its temporary id.
    pub fn push_pending(&mut self, entry: MessageEntry) -> String {
        let temp_id = entry.key().to_string();
        self.entries.push(entry);
        temp_id
    }

    /// Replaces the pending entry `temp_id` with the persisted message.
    ///
    /// The sender display info already resolved on the pending entry is kept.
    /// The persisted timestamp supersedes the client one, so the entry may
    /// move.
    pub fn confirm(&mut self, temp_id: &str, message: Message) -> Reconciliation {
        let Some(index) = self.position_of_temp(temp_id) else {
            return Reconciliation::Missing;
        };

        if self.contains_server_id(&message.id) {
            self.entries.remove(index);
            return Reconciliation::DroppedDuplicate;
        }

        let sender = self.entries[index].sender.clone();
        self.entries[index] = MessageEntry::confirmed(message, sender);
        self.sort();
        Reconciliation::Replaced
    }

    /// Removes the pending entry `temp_id` after a failed send.
    pub fn fail(&mut self, temp_id: &str) -> Option<MessageEntry> {
        let index = self.position_of_temp(temp_id)?;
        Some(self.entries.remove(index))
    }

    /// Applies a "message created" event.
    ///
    /// Returns `false` when an entry with the same server id is already
    /// present, leaving the timeline untouched.
    pub fn ingest(&mut self, message: Message, sender: SenderInfo) -> bool {
        if self.contains_server_id(&message.id) {
            return false;
        }
        self.entries.push(MessageEntry::confirmed(message, sender));
        self.sort();
        true
    }

    /// Applies a "message updated" event to an existing confirmed entry.
    pub fn apply_update(&mut self, message: &Message) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.server_id() == Some(message.id.as_str()))
        else {
            return false;
        };
        entry.content = message.content.clone();
        entry.read_by.extend(message.read_by.iter().cloned());
        true
    }

    /// Applies a "message deleted" event. Absence is not an error.
    pub fn remove(&mut self, server_id: &str) -> Option<MessageEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.server_id() == Some(server_id))?;
        Some(self.entries.remove(index))
    }

    /// Re-inserts an entry, e.g. after a failed delete.
    pub fn restore(&mut self, entry: MessageEntry) {
        if let Some(server_id) = entry.server_id()
            && self.contains_server_id(server_id)
        {
            return;
        }
        self.entries.push(entry);
        self.sort();
    }

    /// Adds `user_id` to the read set of every confirmed entry not yet read
    /// by them and returns the server ids that changed.
    pub fn mark_read(&mut self, user_id: &str) -> Vec<String> {
        self.entries
            .iter_mut()
            .filter(|e| !e.is_pending() && !e.read_by.contains(user_id))
            .filter_map(|e| {
                e.read_by.insert(user_id.to_string());
                e.server_id().map(str::to_string)
            })
            .collect()
    }

    fn position_of_temp(&self, temp_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.temp_id() == Some(temp_id))
    }

    fn sort(&mut self) {
        // Stable: entries with equal timestamps keep arrival order.
        self.entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sender(id: &str) -> SenderInfo {
        SenderInfo {
            user_id: id.to_string(),
            display_name: format!("User {}", id),
            avatar_url: None,
        }
    }

    fn message(id: &str, sender_id: &str, content: &str, at: DateTime<Utc>) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: at,
            read_by: vec![sender_id.to_string()],
        }
    }

    #[test]
    fn test_pending_entry_has_temp_id_and_sender_read() {
        let entry = MessageEntry::pending("c1", sender("a"), "hello", Utc::now());
        assert!(entry.is_pending());
        assert!(is_temp_id(entry.key()));
        assert!(entry.read_by.contains("a"));
    }

    #[test]
    fn test_confirm_replaces_exactly_one_entry() {
        let mut timeline = MessageTimeline::new();
        let now = Utc::now();
        let temp_id = timeline.push_pending(MessageEntry::pending("c1", sender("a"), "hello", now));

        let outcome = timeline.confirm(&temp_id, message("m1", "a", "hello", now));

        assert_eq!(outcome, Reconciliation::Replaced);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].server_id(), Some("m1"));
        assert_eq!(timeline.pending_count(), 0);
        assert_eq!(timeline.entries()[0].sender.display_name, "User a");
    }

    #[test]
    fn test_echo_before_confirmation_leaves_one_copy() {
        let mut timeline = MessageTimeline::new();
        let now = Utc::now();
        let temp_id = timeline.push_pending(MessageEntry::pending("c1", sender("a"), "hello", now));

        assert!(timeline.ingest(message("m1", "a", "hello", now), sender("a")));
        assert_eq!(timeline.len(), 2);

        let outcome = timeline.confirm(&temp_id, message("m1", "a", "hello", now));
        assert_eq!(outcome, Reconciliation::DroppedDuplicate);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].server_id(), Some("m1"));
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let mut timeline = MessageTimeline::new();
        let now = Utc::now();
        assert!(timeline.ingest(message("m1", "b", "hi", now), sender("b")));
        let before = timeline.len();

        assert!(!timeline.ingest(message("m1", "b", "hi", now), sender("b")));
        assert_eq!(timeline.len(), before);
    }

    #[test]
    fn test_fail_removes_only_the_targeted_pending_entry() {
        let mut timeline = MessageTimeline::new();
        let now = Utc::now();
        let first = timeline.push_pending(MessageEntry::pending("c1", sender("a"), "one", now));
        let second = timeline.push_pending(MessageEntry::pending(
            "c1",
            sender("a"),
            "two",
            now + Duration::milliseconds(5),
        ));

        let removed = timeline.fail(&first).unwrap();
        assert_eq!(removed.content, "one");
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].temp_id(), Some(second.as_str()));
        assert!(timeline.fail(&first).is_none());
    }

    #[test]
    fn test_server_timestamp_supersedes_placeholder() {
        let mut timeline = MessageTimeline::new();
        let base = Utc::now();
        // Client clock runs ahead of the server.
        let temp_id = timeline.push_pending(MessageEntry::pending(
            "c1",
            sender("a"),
            "mine",
            base + Duration::seconds(10),
        ));
        timeline.ingest(message("m0", "b", "theirs", base + Duration::seconds(5)), sender("b"));
        assert_eq!(timeline.entries()[1].content, "mine");

        timeline.confirm(&temp_id, message("m1", "a", "mine", base + Duration::seconds(1)));

        assert_eq!(timeline.entries()[0].content, "mine");
        assert_eq!(timeline.entries()[0].created_at, base + Duration::seconds(1));
    }

    #[test]
    fn test_remove_absent_message_is_not_an_error() {
        let mut timeline = MessageTimeline::new();
        assert!(timeline.remove("missing").is_none());
    }

    #[test]
    fn test_mark_read_skips_pending_and_already_read() {
        let mut timeline = MessageTimeline::new();
        let now = Utc::now();
        timeline.ingest(message("m1", "b", "hi", now), sender("b"));
        timeline.ingest(message("m2", "a", "yo", now), sender("a"));
        timeline.push_pending(MessageEntry::pending("c1", sender("a"), "later", now));

        let changed = timeline.mark_read("a");
        assert_eq!(changed, vec!["m1".to_string()]);
        assert!(timeline.mark_read("a").is_empty());
    }
}
