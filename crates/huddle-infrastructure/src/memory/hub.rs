//! In-process realtime hub: row change topics, presence and typing.

use huddle_core::chat::Message;
use huddle_core::presence::{PresenceEntry, PresenceEvent};
use huddle_core::realtime::{ChangeEvent, Subscription, TypingSignal};
use huddle_core::task::Task;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

/// Fan-out list for one topic. Closed receivers are pruned on publish.
struct Topic<T> {
    senders: Vec<UnboundedSender<T>>,
}

impl<T> Default for Topic<T> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<T: Clone> Topic<T> {
    fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = unbounded_channel();
        self.senders.push(tx);
        rx
    }

    fn publish(&mut self, event: T) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[derive(Default)]
struct PresenceChannel {
    entries: BTreeMap<String, PresenceEntry>,
    subscribers: Vec<(String, UnboundedSender<PresenceEvent>)>,
}

impl PresenceChannel {
    fn broadcast_except(&mut self, user_id: &str, event: PresenceEvent) {
        self.subscribers
            .retain(|(id, tx)| id == user_id || tx.send(event.clone()).is_ok());
    }
}

/// Realtime channels keyed by workspace or conversation ID.
#[derive(Default)]
pub struct RealtimeHub {
    tasks: Mutex<HashMap<String, Topic<ChangeEvent<Task>>>>,
    messages: Mutex<HashMap<String, Topic<ChangeEvent<Message>>>>,
    typing: Mutex<HashMap<String, Topic<TypingSignal>>>,
    presence: Mutex<HashMap<String, PresenceChannel>>,
}

// Poisoning only happens if a publisher panicked mid-send; the maps stay usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_tasks(&self, workspace_id: &str) -> Subscription<ChangeEvent<Task>> {
        lock(&self.tasks)
            .entry(workspace_id.to_string())
            .or_default()
            .subscribe()
    }

    pub fn publish_task(&self, workspace_id: &str, event: ChangeEvent<Task>) {
        if let Some(topic) = lock(&self.tasks).get_mut(workspace_id) {
            topic.publish(event);
        }
    }

    pub fn subscribe_messages(&self, conversation_id: &str) -> Subscription<ChangeEvent<Message>> {
        lock(&self.messages)
            .entry(conversation_id.to_string())
            .or_default()
            .subscribe()
    }

    pub fn publish_message(&self, conversation_id: &str, event: ChangeEvent<Message>) {
        if let Some(topic) = lock(&self.messages).get_mut(conversation_id) {
            topic.publish(event);
        }
    }

    pub fn subscribe_typing(&self, conversation_id: &str) -> Subscription<TypingSignal> {
        lock(&self.typing)
            .entry(conversation_id.to_string())
            .or_default()
            .subscribe()
    }

    pub fn publish_typing(&self, signal: TypingSignal) {
        if let Some(topic) = lock(&self.typing).get_mut(signal.conversation_id()) {
            topic.publish(signal);
        }
    }

    /// Tracks `entry`, hands the joiner a full sync and tells everyone else.
    pub fn join_presence(
        &self,
        workspace_id: &str,
        entry: PresenceEntry,
    ) -> Subscription<PresenceEvent> {
        let mut channels = lock(&self.presence);
        let channel = channels.entry(workspace_id.to_string()).or_default();

        let user_id = entry.user_id.clone();
        channel.entries.insert(user_id.clone(), entry.clone());
        channel
            .subscribers
            .retain(|(id, tx)| id != &user_id && !tx.is_closed());

        let (tx, rx) = unbounded_channel();
        let _ = tx.send(PresenceEvent::Sync {
            entries: channel.entries.values().cloned().collect(),
        });
        channel.broadcast_except(&user_id, PresenceEvent::Join { entry });
        channel.subscribers.push((user_id, tx));
        rx
    }

    pub fn leave_presence(&self, workspace_id: &str, user_id: &str) {
        let mut channels = lock(&self.presence);
        let Some(channel) = channels.get_mut(workspace_id) else {
            return;
        };
        if channel.entries.remove(user_id).is_none() {
            return;
        }
        channel.subscribers.retain(|(id, _)| id != user_id);
        channel.broadcast_except(
            user_id,
            PresenceEvent::Leave {
                user_id: user_id.to_string(),
            },
        );
    }

    /// Users currently tracked on a workspace channel.
    pub fn online(&self, workspace_id: &str) -> Vec<String> {
        lock(&self.presence)
            .get(workspace_id)
            .map(|c| c.entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
