//! Conversation and message gateways.
//!
//! Defines the interface for chat persistence over `conversations`,
//! `conversation_members` and `messages`.

use super::model::{Conversation, MemberRole, Message, NewConversation, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Gateway for messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Lists the messages of a conversation in ascending creation order.
    async fn list_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Inserts a message and returns the persisted record.
    ///
    /// # Returns
    ///
    /// - `Ok(Message)`: Persisted message carrying the server id and timestamp
    /// - `Err(_)`: The message was not stored
    async fn insert(&self, message: &NewMessage) -> Result<Message>;

    /// Deletes a message.
    async fn delete(&self, message_id: &str) -> Result<()>;

    /// Adds `user_id` to the read set of a message.
    async fn mark_read(&self, message_id: &str, user_id: &str) -> Result<()>;
}

/// Gateway for conversations and their membership.
///
/// # Implementation Notes
///
/// Each method is a single store round-trip. Compound operations (ownership
/// transfer) are sequenced by the caller; only `delete` cascades.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Finds a conversation by ID, membership included.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Conversation))`: Conversation found
    /// - `Ok(None)`: Conversation not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Lists the conversations `user_id` belongs to in a workspace, most
    /// recent activity first.
    async fn list_for_user(&self, workspace_id: &str, user_id: &str) -> Result<Vec<Conversation>>;

    /// Finds the direct conversation between two users, if any.
    async fn find_direct(
        &self,
        workspace_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>>;

    /// Creates a conversation together with its initial members.
    async fn create(&self, conversation: &NewConversation) -> Result<Conversation>;

    /// Renames a group.
    async fn rename(&self, conversation_id: &str, name: &str) -> Result<()>;

    /// Updates the last-message cache.
    async fn update_last_message(
        &self,
        conversation_id: &str,
        preview: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Adds members with the `member` role.
    async fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<()>;

    /// Removes a member.
    async fn remove_member(&self, conversation_id: &str, user_id: &str) -> Result<()>;

    /// Sets the role of an existing member.
    async fn set_member_role(&self, conversation_id: &str, user_id: &str, role: MemberRole)
    -> Result<()>;

    /// Updates the creator reference.
    async fn set_creator(&self, conversation_id: &str, user_id: &str) -> Result<()>;

    /// Deletes the conversation with its messages and members.
    async fn delete(&self, conversation_id: &str) -> Result<()>;
}
