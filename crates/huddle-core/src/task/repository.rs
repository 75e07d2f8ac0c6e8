//! Task repository trait.
//!
//! Defines the gateway for task persistence (`tasks`, `task_comments`).

use super::model::{NewTask, Task, TaskComment, TaskStatus};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract gateway for task persistence.
///
/// This trait decouples the board presenter from the concrete backing store
/// (hosted REST endpoint, in-memory backend).
///
/// # Implementation Notes
///
/// Implementations should:
/// - Return tasks with derived attachment/comment counts filled in
/// - Refresh `updated_at` on every mutation
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Lists the tasks of a workspace, newest first.
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - The workspace to list tasks for
    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>>;

    /// Finds a task by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Task))`: Task found
    /// - `Ok(None)`: Task not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>>;

    /// Inserts a new task and returns the persisted record.
    async fn insert(&self, task: &NewTask) -> Result<Task>;

    /// Persists a status change.
    ///
    /// # Returns
    ///
    /// - `Ok(Task)`: The persisted task with a refreshed `updated_at`
    /// - `Err(_)`: The change was not applied
    async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<Task>;

    /// Persists a description edit. `None` clears the description.
    async fn update_description(&self, task_id: &str, description: Option<&str>) -> Result<Task>;

    /// Adds a comment to a task.
    async fn add_comment(&self, task_id: &str, user_id: &str, content: &str)
    -> Result<TaskComment>;

    /// Lists the comments of a task, oldest first.
    async fn list_comments(&self, task_id: &str) -> Result<Vec<TaskComment>>;
}
