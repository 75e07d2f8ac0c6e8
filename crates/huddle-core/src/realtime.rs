//! Realtime gateway.
//!
//! Row change subscriptions, presence channels and the typing broadcast
//! channel of the backing platform. Events for a topic are delivered in
//! publish order; the client never re-orders them.

use crate::chat::Message;
use crate::error::Result;
use crate::presence::{PresenceEntry, PresenceEvent};
use crate::task::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

/// A row change observed on a subscribed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent<T> {
    Inserted { record: T },
    Updated { record: T },
    Deleted { id: String },
}

impl<T> ChangeEvent<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted { .. } => "insert",
            ChangeEvent::Updated { .. } => "update",
            ChangeEvent::Deleted { .. } => "delete",
        }
    }
}

/// Payload of the typing broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TypingSignal {
    Started {
        conversation_id: String,
        user_id: String,
        display_name: String,
    },
    Stopped {
        conversation_id: String,
        user_id: String,
    },
}

impl TypingSignal {
    pub fn conversation_id(&self) -> &str {
        match self {
            TypingSignal::Started { conversation_id, .. }
            | TypingSignal::Stopped { conversation_id, .. } => conversation_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            TypingSignal::Started { user_id, .. } | TypingSignal::Stopped { user_id, .. } => user_id,
        }
    }
}

/// Receiving end of a realtime subscription. Dropping it unsubscribes.
pub type Subscription<T> = UnboundedReceiver<T>;

/// Realtime channels of the backing platform.
#[async_trait]
pub trait RealtimeGateway: Send + Sync {
    /// Subscribes to task row changes of a workspace.
    async fn subscribe_tasks(&self, workspace_id: &str) -> Result<Subscription<ChangeEvent<Task>>>;

    /// Subscribes to message row changes of a conversation.
    async fn subscribe_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Subscription<ChangeEvent<Message>>>;

    /// Tracks `entry` on the workspace presence channel and subscribes to it.
    ///
    /// The first event delivered is a full `Sync`.
    async fn join_presence(
        &self,
        workspace_id: &str,
        entry: PresenceEntry,
    ) -> Result<Subscription<PresenceEvent>>;

    /// Untracks `user_id` from the workspace presence channel.
    async fn leave_presence(&self, workspace_id: &str, user_id: &str) -> Result<()>;

    /// Broadcasts a typing signal to the conversation channel.
    async fn send_typing(&self, signal: TypingSignal) -> Result<()>;

    /// Subscribes to typing signals of a conversation.
    async fn subscribe_typing(&self, conversation_id: &str) -> Result<Subscription<TypingSignal>>;
}
