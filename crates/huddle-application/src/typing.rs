//! Typing indicators.
//!
//! Outgoing signals are throttled per conversation. Incoming signals show a
//! sender as typing until a stop signal arrives or the expiry elapses
//! without a fresh signal.

use huddle_core::error::Result;
use huddle_core::realtime::{RealtimeGateway, Subscription, TypingSignal};
use huddle_core::SessionContext;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sends throttled typing signals for the current user.
pub struct TypingBroadcaster {
    ctx: Arc<SessionContext>,
    realtime: Arc<dyn RealtimeGateway>,
    throttle: Duration,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl TypingBroadcaster {
    pub fn new(ctx: SessionContext, realtime: Arc<dyn RealtimeGateway>, throttle: Duration) -> Self {
        Self {
            ctx: Arc::new(ctx),
            realtime,
            throttle,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Called on every local keystroke. Returns whether a signal went out.
    pub async fn keystroke(&self, conversation_id: &str) -> Result<bool> {
        let now = Instant::now();
        {
            let mut last_sent = self.last_sent.lock().await;
            if let Some(previous) = last_sent.get(conversation_id)
                && now.duration_since(*previous) < self.throttle
            {
                return Ok(false);
            }
            last_sent.insert(conversation_id.to_string(), now);
        }

        self.realtime
            .send_typing(TypingSignal::Started {
                conversation_id: conversation_id.to_string(),
                user_id: self.ctx.user_id().to_string(),
                display_name: self.ctx.user.display_name.clone(),
            })
            .await?;
        Ok(true)
    }

    /// Tells the others the user stopped typing, e.g. after sending.
    pub async fn stop(&self, conversation_id: &str) -> Result<()> {
        self.last_sent.lock().await.remove(conversation_id);
        self.realtime
            .send_typing(TypingSignal::Stopped {
                conversation_id: conversation_id.to_string(),
                user_id: self.ctx.user_id().to_string(),
            })
            .await
    }
}

struct Typist {
    display_name: String,
    expiry: JoinHandle<()>,
}

/// Tracks who is typing in one conversation.
#[derive(Clone)]
pub struct TypingMonitor {
    conversation_id: String,
    self_id: String,
    expiry: Duration,
    typists: Arc<Mutex<BTreeMap<String, Typist>>>,
    stop: CancellationToken,
}

impl TypingMonitor {
    pub fn new(conversation_id: impl Into<String>, self_id: impl Into<String>, expiry: Duration) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            self_id: self_id.into(),
            expiry,
            typists: Arc::new(Mutex::new(BTreeMap::new())),
            stop: CancellationToken::new(),
        }
    }

    /// Applies a received signal. The user's own signals are ignored.
    pub async fn apply(&self, signal: TypingSignal) {
        if signal.conversation_id() != self.conversation_id || signal.user_id() == self.self_id {
            return;
        }

        let mut typists = self.typists.lock().await;
        match signal {
            TypingSignal::Started {
                user_id,
                display_name,
                ..
            } => {
                if let Some(previous) = typists.remove(&user_id) {
                    previous.expiry.abort();
                }
                let expiry = self.arm_expiry(user_id.clone());
                typists.insert(
                    user_id,
                    Typist {
                        display_name,
                        expiry,
                    },
                );
            }
            TypingSignal::Stopped { user_id, .. } => {
                if let Some(typist) = typists.remove(&user_id) {
                    typist.expiry.abort();
                }
            }
        }
    }

    fn arm_expiry(&self, user_id: String) -> JoinHandle<()> {
        let typists = self.typists.clone();
        let expiry = self.expiry;
        tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            // A newer signal aborts this task before it gets here.
            typists.lock().await.remove(&user_id);
        })
    }

    /// Display names of the members currently typing.
    pub async fn typing(&self) -> Vec<String> {
        self.typists
            .lock()
            .await
            .values()
            .map(|t| t.display_name.clone())
            .collect()
    }

    pub async fn is_typing(&self, user_id: &str) -> bool {
        self.typists.lock().await.contains_key(user_id)
    }

    /// Applies signals from `subscription` until `close` is called.
    pub fn listen(&self, mut subscription: Subscription<TypingSignal>) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = monitor.stop.cancelled() => break,
                    signal = subscription.recv() => match signal {
                        Some(signal) => monitor.apply(signal).await,
                        None => break,
                    },
                }
            }
        })
    }

    /// Subscribes to the conversation's typing channel and listens on it.
    pub async fn attach(&self, realtime: &dyn RealtimeGateway) -> Result<JoinHandle<()>> {
        let subscription = realtime.subscribe_typing(&self.conversation_id).await?;
        Ok(self.listen(subscription))
    }

    pub async fn close(&self) {
        self.stop.cancel();
        let mut typists = self.typists.lock().await;
        for (_, typist) in std::mem::take(&mut *typists) {
            typist.expiry.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(user_id: &str) -> TypingSignal {
        TypingSignal::Started {
            conversation_id: "c1".to_string(),
            user_id: user_id.to_string(),
            display_name: format!("User {}", user_id),
        }
    }

    fn stopped(user_id: &str) -> TypingSignal {
        TypingSignal::Stopped {
            conversation_id: "c1".to_string(),
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_expires_without_new_signal() {
        let monitor = TypingMonitor::new("c1", "me", Duration::from_millis(3000));
        monitor.apply(started("b")).await;
        assert!(monitor.is_typing("b").await);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(monitor.is_typing("b").await);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!monitor.is_typing("b").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_signal_rearms_expiry() {
        let monitor = TypingMonitor::new("c1", "me", Duration::from_millis(3000));
        monitor.apply(started("b")).await;
        tokio::time::sleep(Duration::from_millis(2000)).await;
        monitor.apply(started("b")).await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(monitor.is_typing("b").await);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert!(!monitor.is_typing("b").await);
    }

    #[tokio::test]
    async fn test_stop_signal_and_own_signals() {
        let monitor = TypingMonitor::new("c1", "me", Duration::from_millis(3000));
        monitor.apply(started("me")).await;
        monitor.apply(started("b")).await;
        assert_eq!(monitor.typing().await, vec!["User b".to_string()]);

        monitor.apply(stopped("b")).await;
        assert!(monitor.typing().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_conversations_are_ignored() {
        let monitor = TypingMonitor::new("c1", "me", Duration::from_millis(3000));
        monitor
            .apply(TypingSignal::Started {
                conversation_id: "c2".to_string(),
                user_id: "b".to_string(),
                display_name: "B".to_string(),
            })
            .await;
        assert!(monitor.typing().await.is_empty());
    }
}
