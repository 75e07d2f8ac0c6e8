//! Chat session for the active conversation.
//!
//! Holds the message timeline of one conversation at a time. Sends are
//! appended optimistically and reconciled when the insert settles; realtime
//! events are merged idempotently by server id.
//!
//! Switching conversations cancels the current epoch: a history load or a
//! listener that belongs to the previous conversation never writes into the
//! new timeline.

use chrono::Utc;
use futures::future::join_all;
use huddle_core::chat::{
    Conversation, ConversationRepository, MessageEntry, MessageRepository, MessageTimeline,
    NewMessage, Reconciliation, SenderInfo, message_preview,
};
use huddle_core::error::{HuddleError, Result};
use huddle_core::notification::{Notification, Notifier};
use huddle_core::realtime::{ChangeEvent, RealtimeGateway};
use huddle_core::workspace::{Profile, ProfileRepository};
use huddle_core::{SessionContext, chat::Message};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Result of a send from the input box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input or no open conversation.
    Skipped,
    /// A send from the input box is already in flight for this conversation.
    Busy,
    Sent {
        message_id: String,
        reconciliation: Reconciliation,
    },
}

/// Gateways a chat session talks to.
#[derive(Clone)]
pub struct ChatGateways {
    pub messages: Arc<dyn MessageRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub realtime: Arc<dyn RealtimeGateway>,
}

struct ChatState {
    conversation: Option<Conversation>,
    timeline: MessageTimeline,
    input: String,
    /// Conversations with an input-box send in flight.
    sending: HashSet<String>,
    epoch: CancellationToken,
}

/// Presenter for the conversation view.
#[derive(Clone)]
pub struct ChatSession {
    ctx: Arc<SessionContext>,
    state: Arc<RwLock<ChatState>>,
    senders: Arc<RwLock<HashMap<String, SenderInfo>>>,
    gateways: ChatGateways,
    notifier: Arc<dyn Notifier>,
    preview_max_chars: usize,
}

impl ChatSession {
    pub fn new(
        ctx: SessionContext,
        gateways: ChatGateways,
        notifier: Arc<dyn Notifier>,
        preview_max_chars: usize,
    ) -> Self {
        let mut senders = HashMap::new();
        senders.insert(ctx.user.id.clone(), SenderInfo::from(&ctx.user));
        Self {
            ctx: Arc::new(ctx),
            state: Arc::new(RwLock::new(ChatState {
                conversation: None,
                timeline: MessageTimeline::new(),
                input: String::new(),
                sending: HashSet::new(),
                epoch: CancellationToken::new(),
            })),
            senders: Arc::new(RwLock::new(senders)),
            gateways,
            notifier,
            preview_max_chars,
        }
    }

    fn fail<T>(&self, err: HuddleError, generic: &str) -> Result<T> {
        self.notifier
            .notify(Notification::error(err.user_message(generic)));
        Err(err)
    }

    fn me(&self) -> SenderInfo {
        SenderInfo::from(&self.ctx.user)
    }

    // ------------------------------------------------------------------
    // Conversation lifecycle
    // ------------------------------------------------------------------

    /// Makes `conversation_id` the active conversation, loads its history
    /// and starts listening for message changes.
    pub async fn open_conversation(&self, conversation_id: &str) -> Result<()> {
        let conversation = match self.gateways.conversations.find_by_id(conversation_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => {
                return self.fail(
                    HuddleError::not_found("Conversation", conversation_id),
                    "Failed to load conversation",
                );
            }
            Err(e) => return self.fail(e, "Failed to load conversation"),
        };
        if !conversation.is_member(self.ctx.user_id()) {
            return self.fail(
                HuddleError::permission_denied("You are not a member of this conversation"),
                "Failed to load conversation",
            );
        }

        let epoch = {
            let mut state = self.state.write().await;
            state.epoch.cancel();
            state.epoch = CancellationToken::new();
            state.conversation = Some(conversation);
            state.timeline.clear();
            state.input.clear();
            state.epoch.clone()
        };

        // Subscribe before fetching so nothing published in between is lost.
        let subscription = match self.gateways.realtime.subscribe_messages(conversation_id).await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                tracing::warn!(
                    "[ChatSession] Realtime unavailable for {}: {}",
                    conversation_id,
                    e
                );
                None
            }
        };
        if let Some(mut subscription) = subscription {
            let session = self.clone();
            let listener_epoch = epoch.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = listener_epoch.cancelled() => break,
                        event = subscription.recv() => match event {
                            Some(event) => {
                                session.handle_message_event(event).await;
                            }
                            None => break,
                        },
                    }
                }
            });
        }

        let history = match self
            .gateways
            .messages
            .list_by_conversation(conversation_id)
            .await
        {
            Ok(history) => history,
            Err(e) => return self.fail(e, "Failed to load messages"),
        };
        let sender_ids: Vec<String> = history.iter().map(|m| m.sender_id.clone()).collect();
        self.resolve_senders(&sender_ids).await;

        let entries = {
            let senders = self.senders.read().await;
            history
                .into_iter()
                .map(|message| {
                    let sender = sender_or_unknown(&senders, &message.sender_id);
                    MessageEntry::confirmed(message, sender)
                })
                .collect()
        };

        let mut state = self.state.write().await;
        if epoch.is_cancelled() || !is_current(&state, conversation_id) {
            tracing::warn!(
                "[ChatSession] Discarding history of {}, conversation changed",
                conversation_id
            );
            return Ok(());
        }

        // Keep whatever arrived or was sent while the history loaded.
        let arrived = std::mem::take(&mut state.timeline);
        let mut timeline = MessageTimeline::from_entries(entries);
        for entry in arrived.entries() {
            timeline.restore(entry.clone());
        }
        tracing::debug!(
            "[ChatSession] Loaded {} messages for {}",
            timeline.len(),
            conversation_id
        );
        state.timeline = timeline;
        Ok(())
    }

    /// Leaves the active conversation.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.epoch.cancel();
        state.conversation = None;
        state.timeline.clear();
        state.input.clear();
    }

    pub async fn conversation(&self) -> Option<Conversation> {
        self.state.read().await.conversation.clone()
    }

    pub async fn conversation_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .conversation
            .as_ref()
            .map(|c| c.id.clone())
    }

    pub async fn entries(&self) -> Vec<MessageEntry> {
        self.state.read().await.timeline.entries().to_vec()
    }

    // ------------------------------------------------------------------
    // Input and sending
    // ------------------------------------------------------------------

    pub async fn set_input(&self, text: impl Into<String>) {
        self.state.write().await.input = text.into();
    }

    pub async fn input(&self) -> String {
        self.state.read().await.input.clone()
    }

    /// Whether the send button is disabled for the active conversation.
    pub async fn is_sending(&self) -> bool {
        let state = self.state.read().await;
        state
            .conversation
            .as_ref()
            .is_some_and(|c| state.sending.contains(&c.id))
    }

    /// Sends the input box content.
    ///
    /// The message shows up immediately as a pending entry and the input is
    /// cleared. On failure the pending entry is removed and the text is put
    /// back into the input.
    pub async fn send(&self) -> Result<SendOutcome> {
        let (conversation_id, content, temp_id, epoch) = {
            let mut state = self.state.write().await;
            let content = state.input.trim().to_string();
            if content.is_empty() {
                return Ok(SendOutcome::Skipped);
            }
            let Some(conversation_id) = state.conversation.as_ref().map(|c| c.id.clone()) else {
                return Ok(SendOutcome::Skipped);
            };
            if state.sending.contains(&conversation_id) {
                return Ok(SendOutcome::Busy);
            }

            let entry = MessageEntry::pending(&conversation_id, self.me(), &content, Utc::now());
            let temp_id = state.timeline.push_pending(entry);
            state.input.clear();
            state.sending.insert(conversation_id.clone());
            (conversation_id, content, temp_id, state.epoch.clone())
        };

        let result = self.persist(&conversation_id, &content).await;

        let mut state = self.state.write().await;
        state.sending.remove(&conversation_id);
        let current = !epoch.is_cancelled() && is_current(&state, &conversation_id);

        match result {
            Ok(message) => {
                let message_id = message.id.clone();
                let reconciliation = if current {
                    state.timeline.confirm(&temp_id, message.clone())
                } else {
                    Reconciliation::Missing
                };
                drop(state);
                tracing::debug!(
                    "[ChatSession] {} confirmed as {} ({:?})",
                    temp_id,
                    message_id,
                    reconciliation
                );
                self.touch_last_message(&message).await;
                Ok(SendOutcome::Sent {
                    message_id,
                    reconciliation,
                })
            }
            Err(e) => {
                if current {
                    state.timeline.fail(&temp_id);
                    state.input = content;
                }
                drop(state);
                tracing::warn!("[ChatSession] Send of {} failed: {}", temp_id, e);
                self.fail(e, "Failed to send message")
            }
        }
    }

    /// Sends a message without going through the input box.
    ///
    /// Not subject to the one-send-in-flight limit of the input box.
    pub async fn send_programmatic(&self, content: &str) -> Result<Message> {
        let content = content.trim();
        let (conversation_id, temp_id, epoch) = {
            let mut state = self.state.write().await;
            let Some(conversation_id) = state.conversation.as_ref().map(|c| c.id.clone()) else {
                return Err(HuddleError::validation("No conversation is open"));
            };
            if content.is_empty() {
                return Err(HuddleError::validation("Message cannot be empty"));
            }
            let entry = MessageEntry::pending(&conversation_id, self.me(), content, Utc::now());
            let temp_id = state.timeline.push_pending(entry);
            (conversation_id, temp_id, state.epoch.clone())
        };

        let result = self.persist(&conversation_id, content).await;

        let mut state = self.state.write().await;
        let current = !epoch.is_cancelled() && is_current(&state, &conversation_id);
        match result {
            Ok(message) => {
                if current {
                    state.timeline.confirm(&temp_id, message.clone());
                }
                drop(state);
                self.touch_last_message(&message).await;
                Ok(message)
            }
            Err(e) => {
                if current {
                    state.timeline.fail(&temp_id);
                }
                drop(state);
                self.fail(e, "Failed to send message")
            }
        }
    }

    async fn persist(&self, conversation_id: &str, content: &str) -> Result<Message> {
        let message = NewMessage::new(conversation_id, self.ctx.user_id(), content);
        self.gateways.messages.insert(&message).await
    }

    /// Refreshes the conversation's last-message cache.
    async fn touch_last_message(&self, message: &Message) {
        let preview = message_preview(&message.content, self.preview_max_chars);
        if let Err(e) = self
            .gateways
            .conversations
            .update_last_message(&message.conversation_id, &preview, message.created_at)
            .await
        {
            tracing::warn!(
                "[ChatSession] Last message of {} not updated: {}",
                message.conversation_id,
                e
            );
            return;
        }

        let mut state = self.state.write().await;
        if let Some(conversation) = state
            .conversation
            .as_mut()
            .filter(|c| c.id == message.conversation_id)
        {
            conversation.last_message = Some(preview);
            conversation.last_message_at = Some(message.created_at);
        }
    }

    // ------------------------------------------------------------------
    // Realtime
    // ------------------------------------------------------------------

    /// Merges a message row change into the timeline.
    ///
    /// Returns whether the timeline changed. Events for other conversations
    /// and inserts already present are ignored.
    pub async fn handle_message_event(&self, event: ChangeEvent<Message>) -> bool {
        match event {
            ChangeEvent::Inserted { record } => {
                if !self.is_active(&record.conversation_id).await {
                    return false;
                }
                let sender = self.sender_info(&record.sender_id).await;
                let mut state = self.state.write().await;
                if !is_current(&state, &record.conversation_id) {
                    return false;
                }
                let appended = state.timeline.ingest(record, sender);
                if !appended {
                    tracing::debug!("[ChatSession] Ignored duplicate message event");
                }
                appended
            }
            ChangeEvent::Updated { record } => {
                let mut state = self.state.write().await;
                is_current(&state, &record.conversation_id) && state.timeline.apply_update(&record)
            }
            ChangeEvent::Deleted { id } => self.state.write().await.timeline.remove(&id).is_some(),
        }
    }

    async fn is_active(&self, conversation_id: &str) -> bool {
        is_current(&*self.state.read().await, conversation_id)
    }

    async fn sender_info(&self, user_id: &str) -> SenderInfo {
        self.resolve_senders(&[user_id.to_string()]).await;
        sender_or_unknown(&*self.senders.read().await, user_id)
    }

    /// Loads profiles for sender ids not cached yet.
    async fn resolve_senders(&self, user_ids: &[String]) {
        let missing: Vec<String> = {
            let senders = self.senders.read().await;
            let mut missing: Vec<String> = user_ids
                .iter()
                .filter(|id| !senders.contains_key(*id))
                .cloned()
                .collect();
            missing.sort();
            missing.dedup();
            missing
        };
        if missing.is_empty() {
            return;
        }

        match self.gateways.profiles.find_many(&missing).await {
            Ok(profiles) => {
                let mut senders = self.senders.write().await;
                for profile in &profiles {
                    senders.insert(profile.id.clone(), SenderInfo::from(profile));
                }
            }
            Err(e) => tracing::warn!("[ChatSession] Could not resolve senders: {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Read receipts and deletion
    // ------------------------------------------------------------------

    /// Marks every visible confirmed message as read by the current user.
    ///
    /// Returns how many messages changed. Receipts that fail to persist are
    /// logged and not retried.
    pub async fn mark_read(&self) -> usize {
        let changed = self
            .state
            .write()
            .await
            .timeline
            .mark_read(self.ctx.user_id());

        let receipts = changed
            .iter()
            .map(|message_id| self.gateways.messages.mark_read(message_id, self.ctx.user_id()));
        for (message_id, result) in changed.iter().zip(join_all(receipts).await) {
            if let Err(e) = result {
                tracing::warn!("[ChatSession] Read receipt for {} failed: {}", message_id, e);
            }
        }
        changed.len()
    }

    /// Deletes one of the current user's confirmed messages.
    pub async fn delete_message(&self, message_id: &str) -> Result<()> {
        let (entry, epoch) = {
            let mut state = self.state.write().await;
            let Some(entry) = state.timeline.find_by_server_id(message_id) else {
                drop(state);
                return self.fail(
                    HuddleError::not_found("Message", message_id),
                    "Failed to delete message",
                );
            };
            if entry.sender.user_id != self.ctx.user_id() {
                drop(state);
                return self.fail(
                    HuddleError::permission_denied("You can only delete your own messages"),
                    "Failed to delete message",
                );
            }
            let Some(entry) = state.timeline.remove(message_id) else {
                return Ok(());
            };
            (entry, state.epoch.clone())
        };

        if let Err(e) = self.gateways.messages.delete(message_id).await {
            let mut state = self.state.write().await;
            if !epoch.is_cancelled() && is_current(&state, &entry.conversation_id) {
                state.timeline.restore(entry);
            }
            drop(state);
            return self.fail(e, "Failed to delete message");
        }
        Ok(())
    }
}

fn is_current(state: &ChatState, conversation_id: &str) -> bool {
    state
        .conversation
        .as_ref()
        .is_some_and(|c| c.id == conversation_id)
}

fn sender_or_unknown(senders: &HashMap<String, SenderInfo>, user_id: &str) -> SenderInfo {
    senders
        .get(user_id)
        .cloned()
        .unwrap_or_else(|| SenderInfo::from(&Profile::unknown(user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationCenter;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use huddle_core::chat::{ConversationMember, MemberRole, NewConversation};
    use huddle_core::presence::{PresenceEntry, PresenceEvent};
    use huddle_core::realtime::{Subscription, TypingSignal};
    use huddle_core::task::Task;
    use huddle_core::workspace::WorkspaceRole;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

    /// Message store double; echoes are pushed by hand through `echo`.
    #[derive(Default)]
    struct MockMessages {
        stored: Mutex<Vec<Message>>,
        fail_inserts: Mutex<bool>,
    }

    #[async_trait]
    impl MessageRepository for MockMessages {
        async fn list_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
            Ok(self
                .stored
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .cloned()
                .collect())
        }

        async fn insert(&self, message: &NewMessage) -> Result<Message> {
            if *self.fail_inserts.lock().unwrap() {
                return Err(HuddleError::data_access("network down"));
            }
            let mut stored = self.stored.lock().unwrap();
            let message = Message {
                id: format!("m{}", stored.len() + 1),
                conversation_id: message.conversation_id.clone(),
                sender_id: message.sender_id.clone(),
                content: message.content.clone(),
                created_at: Utc::now(),
                read_by: message.read_by.clone(),
            };
            stored.push(message.clone());
            Ok(message)
        }

        async fn delete(&self, message_id: &str) -> Result<()> {
            self.stored.lock().unwrap().retain(|m| m.id != message_id);
            Ok(())
        }

        async fn mark_read(&self, _message_id: &str, _user_id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct MockConversations {
        conversation: Conversation,
        previews: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationRepository for MockConversations {
        async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
            Ok((self.conversation.id == conversation_id).then(|| self.conversation.clone()))
        }
        async fn list_for_user(&self, _w: &str, _u: &str) -> Result<Vec<Conversation>> {
            Ok(vec![self.conversation.clone()])
        }
        async fn find_direct(&self, _w: &str, _a: &str, _b: &str) -> Result<Option<Conversation>> {
            Ok(None)
        }
        async fn create(&self, _c: &NewConversation) -> Result<Conversation> {
            Err(HuddleError::internal("not used"))
        }
        async fn rename(&self, _c: &str, _n: &str) -> Result<()> {
            Ok(())
        }
        async fn update_last_message(&self, _c: &str, preview: &str, _at: DateTime<Utc>) -> Result<()> {
            self.previews.lock().unwrap().push(preview.to_string());
            Ok(())
        }
        async fn add_members(&self, _c: &str, _u: &[String]) -> Result<()> {
            Ok(())
        }
        async fn remove_member(&self, _c: &str, _u: &str) -> Result<()> {
            Ok(())
        }
        async fn set_member_role(&self, _c: &str, _u: &str, _r: MemberRole) -> Result<()> {
            Ok(())
        }
        async fn set_creator(&self, _c: &str, _u: &str) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _c: &str) -> Result<()> {
            Ok(())
        }
    }

    struct MockProfiles;

    #[async_trait]
    impl ProfileRepository for MockProfiles {
        async fn find_by_id(&self, user_id: &str) -> Result<Option<Profile>> {
            Ok(Some(named(user_id)))
        }
        async fn find_many(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
            Ok(user_ids.iter().map(|id| named(id)).collect())
        }
    }

    /// Realtime double handing out one message channel.
    #[derive(Default)]
    struct ManualRealtime {
        messages: Mutex<Vec<UnboundedSender<ChangeEvent<Message>>>>,
    }

    impl ManualRealtime {
        fn echo(&self, event: ChangeEvent<Message>) {
            for tx in self.messages.lock().unwrap().iter() {
                let _ = tx.send(event.clone());
            }
        }
    }

    #[async_trait]
    impl RealtimeGateway for ManualRealtime {
        async fn subscribe_tasks(&self, _w: &str) -> Result<Subscription<ChangeEvent<Task>>> {
            Ok(unbounded_channel().1)
        }
        async fn subscribe_messages(&self, _c: &str) -> Result<Subscription<ChangeEvent<Message>>> {
            let (tx, rx) = unbounded_channel();
            self.messages.lock().unwrap().push(tx);
            Ok(rx)
        }
        async fn join_presence(&self, _w: &str, _e: PresenceEntry) -> Result<Subscription<PresenceEvent>> {
            Ok(unbounded_channel().1)
        }
        async fn leave_presence(&self, _w: &str, _u: &str) -> Result<()> {
            Ok(())
        }
        async fn send_typing(&self, _s: TypingSignal) -> Result<()> {
            Ok(())
        }
        async fn subscribe_typing(&self, _c: &str) -> Result<Subscription<TypingSignal>> {
            Ok(unbounded_channel().1)
        }
    }

    fn named(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            display_name: format!("User {}", id),
            email: None,
            avatar_url: None,
        }
    }

    fn direct() -> Conversation {
        let member = |id: &str| ConversationMember {
            conversation_id: "c1".to_string(),
            user_id: id.to_string(),
            role: MemberRole::Member,
            joined_at: Utc::now(),
        };
        Conversation {
            id: "c1".to_string(),
            workspace_id: "w1".to_string(),
            is_group: false,
            name: None,
            created_by: "a".to_string(),
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
            members: vec![member("a"), member("b")],
        }
    }

    struct Harness {
        chat: ChatSession,
        messages: Arc<MockMessages>,
        conversations: Arc<MockConversations>,
        realtime: Arc<ManualRealtime>,
        center: NotificationCenter,
    }

    async fn harness() -> Harness {
        let messages = Arc::new(MockMessages::default());
        let conversations = Arc::new(MockConversations {
            conversation: direct(),
            previews: Mutex::new(Vec::new()),
        });
        let realtime = Arc::new(ManualRealtime::default());
        let center = NotificationCenter::new(Duration::from_millis(4000));
        let chat = ChatSession::new(
            SessionContext::new(named("a"), "w1", WorkspaceRole::Member),
            ChatGateways {
                messages: messages.clone(),
                conversations: conversations.clone(),
                profiles: Arc::new(MockProfiles),
                realtime: realtime.clone(),
            },
            Arc::new(center.clone()),
            50,
        );
        chat.open_conversation("c1").await.unwrap();
        Harness {
            chat,
            messages,
            conversations,
            realtime,
            center,
        }
    }

    #[tokio::test]
    async fn test_send_confirms_pending_entry() {
        let h = harness().await;
        h.chat.set_input("  hello  ").await;

        let outcome = h.chat.send().await.unwrap();

        assert_eq!(
            outcome,
            SendOutcome::Sent {
                message_id: "m1".to_string(),
                reconciliation: Reconciliation::Replaced
            }
        );
        let entries = h.chat.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].server_id(), Some("m1"));
        assert_eq!(entries[0].content, "hello");
        assert_eq!(entries[0].sender.display_name, "User a");
        assert!(h.chat.input().await.is_empty());
        assert_eq!(*h.conversations.previews.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_send_restores_input() {
        let h = harness().await;
        *h.messages.fail_inserts.lock().unwrap() = true;
        h.chat.set_input("hello").await;

        assert!(h.chat.send().await.is_err());

        assert!(h.chat.entries().await.is_empty());
        assert_eq!(h.chat.input().await, "hello");
        assert_eq!(h.center.last().unwrap().message, "Failed to send message");
        assert!(!h.chat.is_sending().await);
    }

    #[tokio::test]
    async fn test_blank_input_is_skipped() {
        let h = harness().await;
        h.chat.set_input("   ").await;
        assert_eq!(h.chat.send().await.unwrap(), SendOutcome::Skipped);
        assert!(h.messages.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert_event_is_ignored() {
        let h = harness().await;
        h.chat.set_input("hello").await;
        h.chat.send().await.unwrap();
        let stored = h.messages.stored.lock().unwrap()[0].clone();

        let changed = h
            .chat
            .handle_message_event(ChangeEvent::Inserted { record: stored })
            .await;

        assert!(!changed);
        assert_eq!(h.chat.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_insert_and_delete() {
        let h = harness().await;
        let remote = Message {
            id: "r1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "b".to_string(),
            content: "hi a".to_string(),
            created_at: Utc::now(),
            read_by: vec!["b".to_string()],
        };

        assert!(h.chat.handle_message_event(ChangeEvent::Inserted { record: remote }).await);
        assert_eq!(h.chat.entries().await[0].sender.display_name, "User b");

        assert!(h.chat.handle_message_event(ChangeEvent::Deleted { id: "r1".to_string() }).await);
        assert!(!h.chat.handle_message_event(ChangeEvent::Deleted { id: "r1".to_string() }).await);
        assert!(h.chat.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_listener_applies_echo_from_channel() {
        let h = harness().await;
        let remote = Message {
            id: "r1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "b".to_string(),
            content: "hi".to_string(),
            created_at: Utc::now(),
            read_by: vec!["b".to_string()],
        };
        h.realtime.echo(ChangeEvent::Inserted { record: remote });

        for _ in 0..10 {
            if !h.chat.entries().await.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.chat.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_only_sender_may_delete() {
        let h = harness().await;
        let remote = Message {
            id: "r1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "b".to_string(),
            content: "mine".to_string(),
            created_at: Utc::now(),
            read_by: vec!["b".to_string()],
        };
        h.chat
            .handle_message_event(ChangeEvent::Inserted { record: remote })
            .await;

        let err = h.chat.delete_message("r1").await.unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(h.center.last().unwrap().message, "You can only delete your own messages");
        assert_eq!(h.chat.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_long_message_preview_is_truncated() {
        let h = harness().await;
        let long = "x".repeat(60);
        h.chat.send_programmatic(&long).await.unwrap();

        let previews = h.conversations.previews.lock().unwrap().clone();
        assert_eq!(previews[0], format!("{}...", "x".repeat(50)));
    }

    #[tokio::test]
    async fn test_mark_read_counts_unread_messages() {
        let h = harness().await;
        let remote = Message {
            id: "r1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "b".to_string(),
            content: "ping".to_string(),
            created_at: Utc::now(),
            read_by: vec!["b".to_string()],
        };
        h.chat
            .handle_message_event(ChangeEvent::Inserted { record: remote })
            .await;

        assert_eq!(h.chat.mark_read().await, 1);
        assert_eq!(h.chat.mark_read().await, 0);
    }
}
