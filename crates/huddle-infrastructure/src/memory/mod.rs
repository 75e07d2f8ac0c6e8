//! Process-local backend used by tests and the offline demo.

mod backend;
pub mod hub;
mod repositories;

pub use backend::{InMemoryBackend, Operation};
pub use hub::RealtimeHub;
