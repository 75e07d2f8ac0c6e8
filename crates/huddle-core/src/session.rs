//! Signed-in session context.
//!
//! The current user and the current workspace are passed explicitly into
//! every presenter and service. A `SessionContext` is created when a user
//! opens a workspace and dropped when they leave it.

use crate::workspace::{Profile, WorkspaceRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Profile of the signed-in user.
    pub user: Profile,
    /// Workspace currently open.
    pub workspace_id: String,
    /// Role of the user in that workspace.
    pub workspace_role: WorkspaceRole,
}

impl SessionContext {
    pub fn new(user: Profile, workspace_id: impl Into<String>, workspace_role: WorkspaceRole) -> Self {
        Self {
            user,
            workspace_id: workspace_id.into(),
            workspace_role,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn is_workspace_admin(&self) -> bool {
        self.workspace_role == WorkspaceRole::Admin
    }
}
