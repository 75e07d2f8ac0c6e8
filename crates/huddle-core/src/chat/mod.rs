//! Chat domain module.
//!
//! # Module Structure
//!
//! - `model`: `Conversation`, `ConversationMember`, `MemberRole`, `Message`
//! - `timeline`: Optimistic message list and its reconciliation rules
//! - `permission`: Group management role matrix
//! - `repository`: Conversation and message gateway traits

pub mod model;
pub mod permission;
pub mod repository;
pub mod timeline;

pub use model::{
    Conversation, ConversationMember, MemberRole, Message, NewConversation, NewMessage,
    message_preview,
};
pub use permission::{GroupAction, authorize, authorize_removal, is_allowed};
pub use repository::{ConversationRepository, MessageRepository};
pub use timeline::{EntryState, MessageEntry, MessageTimeline, Reconciliation, SenderInfo, is_temp_id};
