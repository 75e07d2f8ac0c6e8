//! REST-backed workspace and profile gateways.

use super::client::{Query, RestClient};
use super::dto::ProfileRow;
use async_trait::async_trait;
use huddle_core::error::Result;
use huddle_core::workspace::{
    Profile, ProfileRepository, Workspace, WorkspaceMember, WorkspaceRepository,
};
use std::sync::Arc;

const WORKSPACES: &str = "workspaces";
const WORKSPACE_MEMBERS: &str = "workspace_members";
const PROFILES: &str = "profiles";

pub struct RestWorkspaceRepository {
    client: Arc<RestClient>,
}

impl RestWorkspaceRepository {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkspaceRepository for RestWorkspaceRepository {
    async fn find_by_id(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        self.client
            .select_one(&Query::table(WORKSPACES).eq("id", workspace_id))
            .await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workspace>> {
        let memberships: Vec<WorkspaceMember> = self
            .client
            .select(&Query::table(WORKSPACE_MEMBERS).eq("user_id", user_id))
            .await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = memberships.into_iter().map(|m| m.workspace_id).collect();
        self.client
            .select(
                &Query::table(WORKSPACES)
                    .in_list("id", &ids)
                    .order("created_at", true),
            )
            .await
    }

    async fn find_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<WorkspaceMember>> {
        let query = Query::table(WORKSPACE_MEMBERS)
            .eq("workspace_id", workspace_id)
            .eq("user_id", user_id);
        self.client.select_one(&query).await
    }

    async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMember>> {
        let query = Query::table(WORKSPACE_MEMBERS)
            .eq("workspace_id", workspace_id)
            .order("joined_at", true);
        self.client.select(&query).await
    }
}

pub struct RestProfileRepository {
    client: Arc<RestClient>,
}

impl RestProfileRepository {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProfileRepository for RestProfileRepository {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<Profile>> {
        let row: Option<ProfileRow> = self
            .client
            .select_one(&Query::table(PROFILES).eq("id", user_id))
            .await?;
        Ok(row.map(Profile::from))
    }

    async fn find_many(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<ProfileRow> = self
            .client
            .select(&Query::table(PROFILES).in_list("id", user_ids))
            .await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }
}
