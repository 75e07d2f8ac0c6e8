//! Workspace session: the composition root for one signed-in user inside
//! one workspace.
//!
//! `start` resolves the user's context, loads the board, subscribes to task
//! changes and joins presence. `end` tears all of it down; results still in
//! flight are discarded by the presenters.

use crate::board::BoardPresenter;
use crate::chat::{ChatGateways, ChatSession};
use crate::conversation_service::ConversationService;
use crate::notifications::NotificationCenter;
use crate::presence::PresenceTracker;
use crate::typing::{TypingBroadcaster, TypingMonitor};
use anyhow::{Context, Result, anyhow};
use huddle_core::chat::{ConversationRepository, MessageRepository};
use huddle_core::config::UiSettings;
use huddle_core::notification::AssignmentMailer;
use huddle_core::realtime::RealtimeGateway;
use huddle_core::task::TaskRepository;
use huddle_core::workspace::{ProfileRepository, WorkspaceRepository};
use huddle_core::SessionContext;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Every gateway a workspace session needs.
#[derive(Clone)]
pub struct Gateways {
    pub tasks: Arc<dyn TaskRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub realtime: Arc<dyn RealtimeGateway>,
    pub mailer: Option<Arc<dyn AssignmentMailer>>,
}

impl Gateways {
    /// Uses one backend for every gateway.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TaskRepository
            + MessageRepository
            + ConversationRepository
            + WorkspaceRepository
            + ProfileRepository
            + RealtimeGateway
            + 'static,
    {
        Self {
            tasks: backend.clone(),
            messages: backend.clone(),
            conversations: backend.clone(),
            workspaces: backend.clone(),
            profiles: backend.clone(),
            realtime: backend,
            mailer: None,
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn AssignmentMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    fn chat(&self) -> ChatGateways {
        ChatGateways {
            messages: self.messages.clone(),
            conversations: self.conversations.clone(),
            profiles: self.profiles.clone(),
            realtime: self.realtime.clone(),
        }
    }
}

pub struct WorkspaceSession {
    ctx: SessionContext,
    gateways: Gateways,
    ui: UiSettings,
    notifications: NotificationCenter,
    board: BoardPresenter,
    conversations: ConversationService,
    presence: PresenceTracker,
    board_listener: Mutex<Option<JoinHandle<()>>>,
}

impl WorkspaceSession {
    /// Opens `workspace_id` for `user_id`.
    ///
    /// Fails when the user has no profile or is not a member of the
    /// workspace. A board that fails to load is reported as a notification
    /// and leaves the session usable.
    pub async fn start(
        gateways: Gateways,
        user_id: &str,
        workspace_id: &str,
        ui: UiSettings,
    ) -> Result<Self> {
        let user = gateways
            .profiles
            .find_by_id(user_id)
            .await
            .with_context(|| format!("Failed to load profile of {}", user_id))?
            .ok_or_else(|| anyhow!("Unknown user {}", user_id))?;
        let membership = gateways
            .workspaces
            .find_member(workspace_id, user_id)
            .await
            .with_context(|| format!("Failed to check membership in {}", workspace_id))?
            .ok_or_else(|| anyhow!("{} is not a member of workspace {}", user_id, workspace_id))?;

        let ctx = SessionContext::new(user, workspace_id, membership.role);
        let notifications = NotificationCenter::new(ui.toast_ttl());
        let notifier = Arc::new(notifications.clone());

        let mut board = BoardPresenter::new(
            ctx.clone(),
            gateways.tasks.clone(),
            gateways.workspaces.clone(),
            gateways.profiles.clone(),
            notifier.clone(),
        );
        if let Some(mailer) = gateways.mailer.clone() {
            board = board.with_mailer(mailer);
        }
        let conversations = ConversationService::new(
            ctx.clone(),
            gateways.conversations.clone(),
            gateways.workspaces.clone(),
            notifier,
        );
        let presence = PresenceTracker::new(ctx.clone(), gateways.realtime.clone());

        let session = Self {
            ctx,
            gateways,
            ui,
            notifications,
            board,
            conversations,
            presence,
            board_listener: Mutex::new(None),
        };

        let listener = session
            .board
            .attach_realtime(session.gateways.realtime.as_ref())
            .await
            .context("Failed to subscribe to task changes")?;
        *session.board_listener.lock().await = Some(listener);

        if let Err(e) = session.board.load().await {
            tracing::warn!("[WorkspaceSession] Board not loaded: {}", e);
        }
        if let Err(e) = session.presence.connect().await {
            tracing::warn!("[WorkspaceSession] Presence unavailable: {}", e);
        }

        tracing::info!(
            "[WorkspaceSession] Started for {} in {}",
            session.ctx.user_id(),
            session.ctx.workspace_id
        );
        Ok(session)
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn board(&self) -> &BoardPresenter {
        &self.board
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// A chat view bound to this session.
    pub fn open_chat(&self) -> ChatSession {
        ChatSession::new(
            self.ctx.clone(),
            self.gateways.chat(),
            Arc::new(self.notifications.clone()),
            self.ui.preview_max_chars,
        )
    }

    pub fn typing_broadcaster(&self) -> TypingBroadcaster {
        TypingBroadcaster::new(
            self.ctx.clone(),
            self.gateways.realtime.clone(),
            self.ui.typing_throttle(),
        )
    }

    /// Starts watching typing signals of `conversation_id`.
    pub async fn typing_monitor(&self, conversation_id: &str) -> Result<TypingMonitor> {
        let monitor = TypingMonitor::new(
            conversation_id,
            self.ctx.user_id(),
            self.ui.typing_expiry(),
        );
        monitor
            .attach(self.gateways.realtime.as_ref())
            .await
            .context("Failed to subscribe to typing signals")?;
        Ok(monitor)
    }

    /// Ends the session: stops the board, leaves presence.
    pub async fn end(&self) -> Result<()> {
        self.board.unmount().await;
        if let Some(listener) = self.board_listener.lock().await.take() {
            listener.abort();
        }
        self.presence
            .disconnect()
            .await
            .context("Failed to leave presence")?;
        tracing::info!(
            "[WorkspaceSession] Ended for {} in {}",
            self.ctx.user_id(),
            self.ctx.workspace_id
        );
        Ok(())
    }
}
