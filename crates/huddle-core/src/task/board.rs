//! Board column assignment.
//!
//! Column membership is a pure filter over the task list: a task sits in
//! column `C` iff its status is `C` and it matches the active search query.

use super::model::{Task, TaskStatus};
use serde::Serialize;

/// One rendered board column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub label: &'static str,
    pub tasks: Vec<Task>,
}

/// Tasks belonging to the `status` column.
pub fn column_tasks<'a>(tasks: &'a [Task], status: TaskStatus, query: Option<&str>) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| task.status == status)
        .filter(|task| query.is_none_or(|q| task.matches_query(q)))
        .collect()
}

/// Groups tasks into all six columns, in board order.
pub fn build_columns(tasks: &[Task], query: Option<&str>) -> Vec<BoardColumn> {
    TaskStatus::all()
        .into_iter()
        .map(|status| BoardColumn {
            status,
            label: status.label(),
            tasks: column_tasks(tasks, status, query).into_iter().cloned().collect(),
        })
        .collect()
}
