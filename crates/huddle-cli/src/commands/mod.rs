pub mod board;
pub mod chat;
pub mod demo;
pub mod group;

use anyhow::{Context, Result, anyhow};
use huddle_application::{Gateways, WorkspaceSession};
use huddle_core::config::RootConfig;
use huddle_core::notification::NotificationLevel;
use huddle_infrastructure::{
    ConfigService, DetachedRealtime, HttpAssignmentMailer, RestClient,
    RestConversationRepository, RestMessageRepository, RestProfileRepository,
    RestTaskRepository, RestWorkspaceRepository,
};
use std::path::Path;
use std::sync::Arc;

pub fn config_service(path: Option<&Path>) -> Result<ConfigService> {
    match path {
        Some(path) => Ok(ConfigService::with_path(path)),
        None => ConfigService::new().context("Failed to locate configuration"),
    }
}

pub fn show_config(service: &ConfigService, config: &RootConfig) -> Result<()> {
    let mut shown = config.clone();
    if !shown.backend.anon_key.is_empty() {
        shown.backend.anon_key = "***".to_string();
    }
    if shown.backend.access_token.is_some() {
        shown.backend.access_token = Some("***".to_string());
    }
    if !shown.email.api_key.is_empty() {
        shown.email.api_key = "***".to_string();
    }
    println!("# {}", service.path().display());
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// Who acts, and where.
pub struct Target {
    pub user_id: String,
    pub workspace_id: String,
}

impl Target {
    /// Command line flags win over the `[identity]` section.
    pub fn resolve(
        config: &RootConfig,
        user: Option<String>,
        workspace: Option<String>,
    ) -> Result<Self> {
        let user_id = user
            .or_else(|| config.identity.user_id.clone())
            .ok_or_else(|| anyhow!("No user given: pass --user or set identity.user_id"))?;
        let workspace_id = workspace
            .or_else(|| config.identity.workspace_id.clone())
            .ok_or_else(|| {
                anyhow!("No workspace given: pass --workspace or set identity.workspace_id")
            })?;
        Ok(Self {
            user_id,
            workspace_id,
        })
    }
}

/// Gateways over the hosted backend.
///
/// The command line client runs one command and exits, so realtime
/// subscriptions are detached.
pub fn rest_gateways(config: &RootConfig) -> Result<Gateways> {
    let client = Arc::new(RestClient::new(&config.backend)?);
    let mut gateways = Gateways {
        tasks: Arc::new(RestTaskRepository::new(client.clone())),
        messages: Arc::new(RestMessageRepository::new(client.clone())),
        conversations: Arc::new(RestConversationRepository::new(client.clone())),
        workspaces: Arc::new(RestWorkspaceRepository::new(client.clone())),
        profiles: Arc::new(RestProfileRepository::new(client)),
        realtime: Arc::new(DetachedRealtime::new()),
        mailer: None,
    };

    let mailer = HttpAssignmentMailer::new(config.email.clone());
    if mailer.is_enabled() {
        gateways = gateways.with_mailer(Arc::new(mailer));
    }
    Ok(gateways)
}

pub async fn connect(config: &RootConfig, target: &Target) -> Result<WorkspaceSession> {
    let gateways = rest_gateways(config)?;
    WorkspaceSession::start(
        gateways,
        &target.user_id,
        &target.workspace_id,
        config.ui.clone(),
    )
    .await
}

/// Prints the notifications raised so far.
pub fn print_notifications(session: &WorkspaceSession) {
    for notification in session.notifications().history() {
        let marker = match notification.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "--",
            NotificationLevel::Error => "!!",
        };
        println!("[{}] {}", marker, notification.message);
    }
}
