//! Task domain module.
//!
//! This module contains the task board domain: the status set, task
//! records, the pure column filter and the task gateway trait.
//!
//! # Module Structure
//!
//! - `model`: `TaskStatus`, `Task`, `NewTask`, `TaskComment`, `TaskAssignment`
//! - `board`: Column assignment (`build_columns`, `column_tasks`)
//! - `repository`: Task gateway trait for persistence

pub mod board;
mod model;
pub mod repository;

// Re-export public API
pub use board::{BoardColumn, build_columns, column_tasks};
pub use model::{NewTask, Task, TaskAssignment, TaskComment, TaskStatus};
pub use repository::TaskRepository;
