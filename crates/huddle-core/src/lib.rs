//! Domain layer for Huddle.
//!
//! Models, gateway traits and the pure rules of the task board, chat and
//! presence features. Nothing in this crate performs I/O.

pub mod chat;
pub mod config;
pub mod error;
pub mod notification;
pub mod presence;
pub mod realtime;
pub mod session;
pub mod task;
pub mod workspace;

// Re-export common error type
pub use error::{HuddleError, Result};
pub use session::SessionContext;
