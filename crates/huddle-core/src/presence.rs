//! Workspace presence.
//!
//! Presence is ephemeral: entries exist only while a member holds a
//! connection to the workspace presence channel and are rebuilt from the
//! channel on every reconnect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a member publishes when joining a presence channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub user_id: String,
    pub display_name: String,
    pub online_at: DateTime<Utc>,
}

/// Events delivered by a presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresenceEvent {
    /// Full channel state; replaces whatever the client had.
    Sync { entries: Vec<PresenceEntry> },
    Join { entry: PresenceEntry },
    Leave { user_id: String },
}

/// The set of members currently online.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlineSet {
    members: BTreeMap<String, PresenceEntry>,
}

impl OnlineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one presence event.
    pub fn apply(&mut self, event: PresenceEvent) {
        match event {
            PresenceEvent::Sync { entries } => {
                self.members = entries
                    .into_iter()
                    .map(|entry| (entry.user_id.clone(), entry))
                    .collect();
            }
            PresenceEvent::Join { entry } => {
                self.members.insert(entry.user_id.clone(), entry);
            }
            PresenceEvent::Leave { user_id } => {
                self.members.remove(&user_id);
            }
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.members.contains_key(user_id)
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<PresenceEntry> {
        self.members.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> PresenceEntry {
        PresenceEntry {
            user_id: id.to_string(),
            display_name: id.to_uppercase(),
            online_at: Utc::now(),
        }
    }

    #[test]
    fn test_sync_replaces_instead_of_merging() {
        let mut set = OnlineSet::new();
        set.apply(PresenceEvent::Join { entry: entry("a") });
        set.apply(PresenceEvent::Sync {
            entries: vec![entry("b"), entry("c")],
        });

        assert!(!set.is_online("a"));
        assert_eq!(set.user_ids(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_join_and_leave_touch_only_that_member() {
        let mut set = OnlineSet::new();
        set.apply(PresenceEvent::Sync {
            entries: vec![entry("a"), entry("b")],
        });
        set.apply(PresenceEvent::Join { entry: entry("c") });
        set.apply(PresenceEvent::Leave {
            user_id: "a".to_string(),
        });

        assert_eq!(set.user_ids(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_leave_of_unknown_member_is_ignored() {
        let mut set = OnlineSet::new();
        set.apply(PresenceEvent::Leave {
            user_id: "ghost".to_string(),
        });
        assert!(set.is_empty());
    }
}
