//! Gateways over the hosted relational store's REST endpoint.

mod chat_repository;
pub mod client;
pub mod dto;
mod task_repository;
mod workspace_repository;

pub use chat_repository::{RestConversationRepository, RestMessageRepository};
pub(crate) use chat_repository::sort_by_activity;
pub use client::{Query, RestClient};
pub use task_repository::RestTaskRepository;
pub use workspace_repository::{RestProfileRepository, RestWorkspaceRepository};
