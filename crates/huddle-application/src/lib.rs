//! Application layer for Huddle.
//!
//! Presenters and use cases that coordinate the domain rules of
//! `huddle-core` with the gateways: the task board, the chat session,
//! typing indicators, presence, group management and the workspace session
//! that ties them to one signed-in user.

pub mod board;
pub mod chat;
pub mod conversation_service;
pub mod notifications;
pub mod presence;
pub mod session;
pub mod typing;

pub use board::{BoardPresenter, DragOutcome, DragPayload};
pub use chat::{ChatGateways, ChatSession, SendOutcome};
pub use conversation_service::ConversationService;
pub use notifications::NotificationCenter;
pub use presence::PresenceTracker;
pub use session::{Gateways, WorkspaceSession};
pub use typing::{TypingBroadcaster, TypingMonitor};
