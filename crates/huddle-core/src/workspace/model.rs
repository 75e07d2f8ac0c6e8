//! Workspace and profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a member inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceRole {
    Admin,
    Member,
}

impl Default for WorkspaceRole {
    fn default() -> Self {
        WorkspaceRole::Member
    }
}

/// A workspace grouping boards, chat and members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Membership row in `workspace_members`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub workspace_id: String,
    pub user_id: String,
    #[serde(default)]
    pub role: WorkspaceRole,
    pub joined_at: DateTime<Utc>,
}

/// Public profile of a user (`profiles`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Placeholder used when a profile cannot be resolved.
    pub fn unknown(user_id: impl Into<String>) -> Self {
        Self {
            id: user_id.into(),
            display_name: "Unknown user".to_string(),
            email: None,
            avatar_url: None,
        }
    }
}
