//! Workspace membership and profile gateways.

use super::model::{Profile, Workspace, WorkspaceMember};
use crate::error::Result;
use async_trait::async_trait;

/// Gateway over `workspaces` and `workspace_members`.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Finds a workspace by its ID.
    async fn find_by_id(&self, workspace_id: &str) -> Result<Option<Workspace>>;

    /// Lists the workspaces `user_id` belongs to.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workspace>>;

    /// Finds the membership of `user_id` in `workspace_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(WorkspaceMember))`: The user is a member
    /// - `Ok(None)`: The user is not a member
    async fn find_member(&self, workspace_id: &str, user_id: &str)
    -> Result<Option<WorkspaceMember>>;

    /// Lists all members of a workspace.
    async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMember>>;

    /// Checks whether `user_id` is a member of `workspace_id`.
    async fn is_member(&self, workspace_id: &str, user_id: &str) -> Result<bool> {
        Ok(self.find_member(workspace_id, user_id).await?.is_some())
    }
}

/// Gateway over `profiles`.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds a profile by user ID.
    async fn find_by_id(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Resolves several profiles at once. Unknown IDs are skipped.
    async fn find_many(&self, user_ids: &[String]) -> Result<Vec<Profile>>;
}
