//! Gateway implementations for Huddle.
//!
//! - `rest`: hosted relational store over its REST endpoint
//! - `memory`: in-process backend with a realtime hub and fault injection
//! - `mailer`: assignment notices over HTTP
//! - `config_service` / `paths`: configuration file handling

pub mod config_service;
pub mod detached;
pub mod mailer;
pub mod memory;
pub mod paths;
pub mod rest;

pub use crate::config_service::ConfigService;
pub use crate::detached::DetachedRealtime;
pub use crate::mailer::HttpAssignmentMailer;
pub use crate::memory::{InMemoryBackend, Operation};
pub use crate::paths::HuddlePaths;
pub use crate::rest::{
    RestClient, RestConversationRepository, RestMessageRepository, RestProfileRepository,
    RestTaskRepository, RestWorkspaceRepository,
};
