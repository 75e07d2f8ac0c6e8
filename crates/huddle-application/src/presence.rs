//! Workspace presence tracker.

use chrono::Utc;
use huddle_core::error::Result;
use huddle_core::presence::{OnlineSet, PresenceEntry};
use huddle_core::realtime::RealtimeGateway;
use huddle_core::SessionContext;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Mirrors the workspace presence channel into an [`OnlineSet`].
///
/// The set is rebuilt from the channel's sync event on every connect, so a
/// reconnect never carries stale members over.
#[derive(Clone)]
pub struct PresenceTracker {
    ctx: Arc<SessionContext>,
    realtime: Arc<dyn RealtimeGateway>,
    online: Arc<RwLock<OnlineSet>>,
    connection: Arc<Mutex<Option<CancellationToken>>>,
}

impl PresenceTracker {
    pub fn new(ctx: SessionContext, realtime: Arc<dyn RealtimeGateway>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            realtime,
            online: Arc::new(RwLock::new(OnlineSet::new())),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Tracks the current user on the workspace channel and starts applying
    /// its events. Reconnecting replaces the previous connection.
    pub async fn connect(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if let Some(previous) = connection.take() {
            previous.cancel();
        }

        let entry = PresenceEntry {
            user_id: self.ctx.user_id().to_string(),
            display_name: self.ctx.user.display_name.clone(),
            online_at: Utc::now(),
        };
        let mut subscription = self
            .realtime
            .join_presence(&self.ctx.workspace_id, entry)
            .await?;

        let token = CancellationToken::new();
        *connection = Some(token.clone());
        drop(connection);

        // The first event is a full sync, so the set never starts stale.
        if let Some(first) = subscription.recv().await {
            self.online.write().await.apply(first);
        }

        let online = self.online.clone();
        let workspace_id = self.ctx.workspace_id.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = subscription.recv() => match event {
                        Some(event) => online.write().await.apply(event),
                        None => break,
                    },
                }
            }
            tracing::debug!("[PresenceTracker] Listener for {} stopped", workspace_id);
        });

        tracing::info!(
            "[PresenceTracker] {} joined presence of {}",
            self.ctx.user_id(),
            self.ctx.workspace_id
        );
        Ok(())
    }

    /// Leaves the channel and forgets everyone.
    pub async fn disconnect(&self) -> Result<()> {
        let Some(token) = self.connection.lock().await.take() else {
            return Ok(());
        };
        token.cancel();
        self.online.write().await.clear();
        self.realtime
            .leave_presence(&self.ctx.workspace_id, self.ctx.user_id())
            .await
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.online.read().await.is_online(user_id)
    }

    pub async fn online_user_ids(&self) -> Vec<String> {
        self.online.read().await.user_ids()
    }

    pub async fn online_count(&self) -> usize {
        self.online.read().await.len()
    }
}
