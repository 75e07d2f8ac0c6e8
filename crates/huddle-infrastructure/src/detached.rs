//! Realtime gateway for one-shot command line invocations.
//!
//! Subscriptions stay open for the lifetime of the gateway but never
//! deliver anything; typing signals are dropped.

use async_trait::async_trait;
use huddle_core::chat::Message;
use huddle_core::error::Result;
use huddle_core::presence::{PresenceEntry, PresenceEvent};
use huddle_core::realtime::{ChangeEvent, RealtimeGateway, Subscription, TypingSignal};
use huddle_core::task::Task;
use std::sync::Mutex;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

#[derive(Default)]
pub struct DetachedRealtime {
    // Held so receivers do not observe a closed channel.
    task_senders: Mutex<Vec<UnboundedSender<ChangeEvent<Task>>>>,
    message_senders: Mutex<Vec<UnboundedSender<ChangeEvent<Message>>>>,
    presence_senders: Mutex<Vec<UnboundedSender<PresenceEvent>>>,
    typing_senders: Mutex<Vec<UnboundedSender<TypingSignal>>>,
}

fn open<T>(holder: &Mutex<Vec<UnboundedSender<T>>>) -> Subscription<T> {
    let (tx, rx) = unbounded_channel();
    holder
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(tx);
    rx
}

impl DetachedRealtime {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RealtimeGateway for DetachedRealtime {
    async fn subscribe_tasks(&self, _workspace_id: &str) -> Result<Subscription<ChangeEvent<Task>>> {
        Ok(open(&self.task_senders))
    }

    async fn subscribe_messages(
        &self,
        _conversation_id: &str,
    ) -> Result<Subscription<ChangeEvent<Message>>> {
        Ok(open(&self.message_senders))
    }

    async fn join_presence(
        &self,
        _workspace_id: &str,
        entry: PresenceEntry,
    ) -> Result<Subscription<PresenceEvent>> {
        let (tx, rx) = unbounded_channel();
        let _ = tx.send(PresenceEvent::Sync {
            entries: vec![entry],
        });
        self.presence_senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        Ok(rx)
    }

    async fn leave_presence(&self, _workspace_id: &str, _user_id: &str) -> Result<()> {
        Ok(())
    }

    async fn send_typing(&self, _signal: TypingSignal) -> Result<()> {
        Ok(())
    }

    async fn subscribe_typing(&self, _conversation_id: &str) -> Result<Subscription<TypingSignal>> {
        Ok(open(&self.typing_senders))
    }
}
