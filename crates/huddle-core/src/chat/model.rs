//! Conversation and message models.

use crate::error::{HuddleError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a member inside a conversation.
///
/// Direct conversations only ever use `Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Member
    }
}

/// Row in `conversation_members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMember {
    pub conversation_id: String,
    pub user_id: String,
    #[serde(default)]
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// A direct or group conversation together with its membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub workspace_id: String,
    pub is_group: bool,
    /// Only set for groups.
    #[serde(default)]
    pub name: Option<String>,
    pub created_by: String,
    /// Cached preview of the latest message.
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<ConversationMember>,
}

impl Conversation {
    pub fn member(&self, user_id: &str) -> Option<&ConversationMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn role_of(&self, user_id: &str) -> Option<MemberRole> {
        self.member(user_id).map(|m| m.role)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.role == MemberRole::Owner)
            .map(|m| m.user_id.as_str())
    }

    pub fn owner_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.role == MemberRole::Owner)
            .count()
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    /// The other participant of a direct conversation.
    pub fn counterpart(&self, user_id: &str) -> Option<&str> {
        if self.is_group {
            return None;
        }
        self.members
            .iter()
            .map(|m| m.user_id.as_str())
            .find(|id| *id != user_id)
    }

    /// Checks the membership invariants.
    ///
    /// A group has exactly one owner. A direct conversation has exactly two
    /// members and no owner or admin roles.
    pub fn check_membership(&self) -> Result<()> {
        if self.is_group {
            let owners = self.owner_count();
            if owners != 1 {
                return Err(HuddleError::Inconsistent(format!(
                    "group {} has {} owners",
                    self.id, owners
                )));
            }
        } else {
            if self.members.len() != 2 {
                return Err(HuddleError::Inconsistent(format!(
                    "direct conversation {} has {} members",
                    self.id,
                    self.members.len()
                )));
            }
            if self.members.iter().any(|m| m.role != MemberRole::Member) {
                return Err(HuddleError::Inconsistent(format!(
                    "direct conversation {} carries group roles",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Input for creating a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    pub workspace_id: String,
    pub is_group: bool,
    pub name: Option<String>,
    pub created_by: String,
    /// Initial members with their roles, creator included.
    pub members: Vec<(String, MemberRole)>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_by: Vec<String>,
}

/// Input for inserting a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub read_by: Vec<String>,
}

impl NewMessage {
    /// A message is always read by its sender.
    pub fn new(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        Self {
            conversation_id: conversation_id.into(),
            read_by: vec![sender_id.clone()],
            sender_id,
            content: content.into(),
        }
    }
}

/// Truncates message content for the conversation list preview.
///
/// Content longer than `max_chars` characters is cut and suffixed with `...`.
pub fn message_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: &str, role: MemberRole) -> ConversationMember {
        ConversationMember {
            conversation_id: "c1".to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: Utc::now(),
        }
    }

    fn conversation(is_group: bool, members: Vec<ConversationMember>) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            workspace_id: "w1".to_string(),
            is_group,
            name: is_group.then(|| "Project X".to_string()),
            created_by: "u1".to_string(),
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
            members,
        }
    }

    #[test]
    fn test_preview_truncates_long_content() {
        let long = "a".repeat(60);
        let preview = message_preview(&long, 50);
        assert_eq!(preview.len(), 53);
        assert!(preview.ends_with("..."));

        assert_eq!(message_preview("hello", 50), "hello");
        assert_eq!(message_preview(&"b".repeat(50), 50), "b".repeat(50));
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let content = "é".repeat(51);
        let preview = message_preview(&content, 50);
        assert_eq!(preview.chars().count(), 53);
    }

    #[test]
    fn test_new_message_is_read_by_sender() {
        let msg = NewMessage::new("c1", "u1", "hello");
        assert_eq!(msg.read_by, vec!["u1".to_string()]);
    }

    #[test]
    fn test_group_requires_single_owner() {
        let ok = conversation(
            true,
            vec![member("u1", MemberRole::Owner), member("u2", MemberRole::Member)],
        );
        assert!(ok.check_membership().is_ok());
        assert_eq!(ok.owner_id(), Some("u1"));

        let two_owners = conversation(
            true,
            vec![member("u1", MemberRole::Owner), member("u2", MemberRole::Owner)],
        );
        assert!(two_owners.check_membership().is_err());

        let no_owner = conversation(true, vec![member("u1", MemberRole::Admin)]);
        assert!(no_owner.check_membership().is_err());
    }

    #[test]
    fn test_direct_conversation_shape() {
        let direct = conversation(
            false,
            vec![member("u1", MemberRole::Member), member("u2", MemberRole::Member)],
        );
        assert!(direct.check_membership().is_ok());
        assert_eq!(direct.counterpart("u1"), Some("u2"));

        let with_owner = conversation(
            false,
            vec![member("u1", MemberRole::Owner), member("u2", MemberRole::Member)],
        );
        assert!(with_owner.check_membership().is_err());
    }
}
