//! Task domain model.
//!
//! Tasks live on a workspace board and move between six fixed status
//! columns. The `tasks` table is the source of truth; these types are the
//! client-side copies.

use crate::error::{HuddleError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

/// Board status of a task.
///
/// The serialized form (`planning`, `in_progress`, ...) doubles as the board
/// column identifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Planning,
    InProgress,
    AtRisk,
    UpdateRequired,
    OnHold,
    Completed,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub fn all() -> Vec<TaskStatus> {
        Self::iter().collect()
    }

    /// Human readable column label.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Planning => "Planning",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::AtRisk => "At Risk",
            TaskStatus::UpdateRequired => "Update Required",
            TaskStatus::OnHold => "On Hold",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Resolves a drop target column identifier.
    ///
    /// Returns `None` for anything that is not one of the six columns, which
    /// callers treat as a drop outside the board.
    pub fn from_column_id(column_id: &str) -> Option<Self> {
        column_id.parse().ok()
    }

    /// The column identifier for this status.
    pub fn column_id(&self) -> &str {
        self.as_ref()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A task record on a workspace board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Member the task is assigned to.
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Derived from `task_attachments`.
    #[serde(default)]
    pub attachment_count: u32,
    /// Derived from `task_comments`.
    #[serde(default)]
    pub comment_count: u32,
}

impl Task {
    /// Whether the task title or description contains `query`, ignoring case.
    ///
    /// An empty (or whitespace-only) query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    /// Whether `user_id` is the assignee of this task.
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assignee_id.as_deref() == Some(user_id)
    }
}

/// Input of the create-task form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub workspace_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub assignee_id: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_by: String,
}

impl NewTask {
    /// Rejects forms the backend would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(HuddleError::validation("Task title is required"));
        }
        Ok(())
    }

    /// Trims the title and drops an empty description.
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }
}

/// A comment on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Data needed to tell an assignee about a new task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: String,
    pub task_title: String,
    pub workspace_id: String,
    pub assignee_email: String,
    pub assignee_name: String,
    pub assigned_by: String,
    pub due_date: Option<NaiveDate>,
}
