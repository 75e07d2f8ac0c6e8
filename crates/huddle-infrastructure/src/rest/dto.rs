//! Row shapes of the hosted tables and their conversion to domain models.

use chrono::{DateTime, NaiveDate, Utc};
use huddle_core::chat::{Conversation, ConversationMember, MemberRole};
use huddle_core::task::{NewTask, Task, TaskStatus};
use huddle_core::workspace::Profile;
use serde::{Deserialize, Serialize};

/// Embedded aggregate returned by `relation(count)`.
#[derive(Debug, Clone, Deserialize)]
pub struct CountRow {
    pub count: u32,
}

fn first_count(rows: &[CountRow]) -> u32 {
    rows.first().map(|r| r.count).unwrap_or(0)
}

pub const TASK_SELECT: &str = "*,task_attachments(count),task_comments(count)";

/// `tasks` row with embedded attachment/comment counts.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub task_attachments: Vec<CountRow>,
    #[serde(default)]
    pub task_comments: Vec<CountRow>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            attachment_count: first_count(&row.task_attachments),
            comment_count: first_count(&row.task_comments),
            id: row.id,
            workspace_id: row.workspace_id,
            title: row.title,
            description: row.description,
            status: row.status,
            assignee_id: row.assigned_to,
            due_date: row.due_date,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert payload for `tasks`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTaskRow<'a> {
    pub workspace_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: TaskStatus,
    pub assigned_to: Option<&'a str>,
    pub due_date: Option<NaiveDate>,
    pub created_by: &'a str,
}

impl<'a> From<&'a NewTask> for NewTaskRow<'a> {
    fn from(task: &'a NewTask) -> Self {
        Self {
            workspace_id: &task.workspace_id,
            title: &task.title,
            description: task.description.as_deref(),
            status: task.status,
            assigned_to: task.assignee_id.as_deref(),
            due_date: task.due_date,
            created_by: &task.created_by,
        }
    }
}

pub const CONVERSATION_SELECT: &str = "*,conversation_members(*)";

/// `conversations` row with embedded members.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRow {
    pub id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub name: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub conversation_members: Vec<ConversationMember>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            workspace_id: row.workspace_id,
            is_group: row.is_group,
            name: row.name,
            created_by: row.created_by,
            last_message: row.last_message,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
            members: row.conversation_members,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConversationRow<'a> {
    pub workspace_id: &'a str,
    pub is_group: bool,
    pub name: Option<&'a str>,
    pub created_by: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMemberRow<'a> {
    pub conversation_id: &'a str,
    pub user_id: &'a str,
    pub role: MemberRole,
}

/// `profiles` row.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let display_name = row
            .full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| row.email.clone())
            .unwrap_or_else(|| "Unknown user".to_string());
        Profile {
            id: row.id,
            display_name,
            email: row.email,
            avatar_url: row.avatar_url,
        }
    }
}
