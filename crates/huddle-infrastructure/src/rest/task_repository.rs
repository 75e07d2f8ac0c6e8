//! REST-backed TaskRepository implementation

use super::client::{Query, RestClient};
use super::dto::{NewTaskRow, TASK_SELECT, TaskRow};
use async_trait::async_trait;
use chrono::Utc;
use huddle_core::error::{HuddleError, Result};
use huddle_core::task::{NewTask, Task, TaskComment, TaskRepository, TaskStatus};
use serde_json::json;
use std::sync::Arc;

const TASKS: &str = "tasks";
const TASK_COMMENTS: &str = "task_comments";

/// Task gateway over the `tasks` and `task_comments` tables.
pub struct RestTaskRepository {
    client: Arc<RestClient>,
}

impl RestTaskRepository {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    async fn patch(&self, task_id: &str, body: serde_json::Value) -> Result<Task> {
        let query = Query::table(TASKS).select(TASK_SELECT).eq("id", task_id);
        let rows: Vec<TaskRow> = self.client.update(&query, &body).await?;
        rows.into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| HuddleError::not_found("Task", task_id))
    }
}

#[async_trait]
impl TaskRepository for RestTaskRepository {
    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>> {
        let query = Query::table(TASKS)
            .select(TASK_SELECT)
            .eq("workspace_id", workspace_id)
            .order("created_at", false);
        let rows: Vec<TaskRow> = self.client.select(&query).await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        let query = Query::table(TASKS).select(TASK_SELECT).eq("id", task_id);
        let row: Option<TaskRow> = self.client.select_one(&query).await?;
        Ok(row.map(Task::from))
    }

    async fn insert(&self, task: &NewTask) -> Result<Task> {
        let rows: Vec<TaskRow> = self.client.insert(TASKS, &NewTaskRow::from(task)).await?;
        rows.into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| HuddleError::data_access("Task insert returned no row"))
    }

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        tracing::debug!("[RestTaskRepository] {} -> {}", task_id, status.column_id());
        self.patch(task_id, json!({ "status": status, "updated_at": Utc::now() }))
            .await
    }

    async fn update_description(&self, task_id: &str, description: Option<&str>) -> Result<Task> {
        self.patch(
            task_id,
            json!({ "description": description, "updated_at": Utc::now() }),
        )
        .await
    }

    async fn add_comment(&self, task_id: &str, user_id: &str, content: &str) -> Result<TaskComment> {
        let body = json!({ "task_id": task_id, "user_id": user_id, "content": content });
        let rows: Vec<TaskComment> = self.client.insert(TASK_COMMENTS, &body).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| HuddleError::data_access("Comment insert returned no row"))
    }

    async fn list_comments(&self, task_id: &str) -> Result<Vec<TaskComment>> {
        let query = Query::table(TASK_COMMENTS)
            .eq("task_id", task_id)
            .order("created_at", true);
        self.client.select(&query).await
    }
}
