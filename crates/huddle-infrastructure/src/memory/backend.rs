//! In-memory backend with fault injection.
//!
//! Holds every table in process and implements all gateway traits, so the
//! presenters can be exercised end-to-end without a network. Each gateway
//! call passes through [`InMemoryBackend::enter`], which counts the call,
//! applies a configured delay and consumes a pending injected failure.

use super::hub::RealtimeHub;
use huddle_core::chat::{Conversation, ConversationMember, MemberRole, Message};
use huddle_core::error::{HuddleError, Result};
use huddle_core::task::{Task, TaskComment};
use huddle_core::workspace::{Profile, Workspace, WorkspaceMember, WorkspaceRole};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

/// Gateway operations that can be counted, delayed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTasks,
    FindTask,
    InsertTask,
    UpdateTaskStatus,
    UpdateTaskDescription,
    AddComment,
    ListComments,
    ListMessages,
    InsertMessage,
    DeleteMessage,
    MarkRead,
    FindConversation,
    ListConversations,
    CreateConversation,
    RenameConversation,
    UpdateLastMessage,
    AddMembers,
    RemoveMember,
    SetMemberRole,
    SetCreator,
    DeleteConversation,
    FindWorkspace,
    ListWorkspaces,
    FindWorkspaceMember,
    ListWorkspaceMembers,
    FindProfile,
    SendTyping,
    Subscribe,
}

#[derive(Default)]
pub(super) struct Tables {
    pub workspaces: Vec<Workspace>,
    pub workspace_members: Vec<WorkspaceMember>,
    pub profiles: HashMap<String, Profile>,
    pub tasks: Vec<Task>,
    pub comments: Vec<TaskComment>,
    pub conversations: Vec<Conversation>,
    pub messages: Vec<Message>,
}

#[derive(Default)]
struct Faults {
    /// Call numbers (1-based, per operation) that fail.
    scheduled: HashMap<Operation, BTreeSet<usize>>,
    calls: HashMap<Operation, usize>,
    delays: HashMap<Operation, Duration>,
}

impl Faults {
    fn schedule(&mut self, op: Operation, skip: usize, times: usize) {
        let next = self.calls.get(&op).copied().unwrap_or(0) + 1 + skip;
        self.scheduled
            .entry(op)
            .or_default()
            .extend(next..next + times);
    }
}

/// Process-local stand-in for the hosted backend.
#[derive(Default)]
pub struct InMemoryBackend {
    pub(super) tables: RwLock<Tables>,
    pub(super) hub: RealtimeHub,
    faults: Mutex<Faults>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `op` fail with a data access error.
    pub fn fail_next(&self, op: Operation) {
        self.fail_times(op, 1);
    }

    /// Makes the next `times` calls of `op` fail.
    pub fn fail_times(&self, op: Operation, times: usize) {
        self.faults().schedule(op, 0, times);
    }

    /// Lets `skip` calls of `op` through, then fails the one after.
    pub fn fail_after(&self, op: Operation, skip: usize) {
        self.faults().schedule(op, skip, 1);
    }

    /// Delays every call of `op` by `delay` before it touches the tables.
    pub fn set_delay(&self, op: Operation, delay: Duration) {
        self.faults().delays.insert(op, delay);
    }

    /// Number of times `op` has been called, failed calls included.
    pub fn call_count(&self, op: Operation) -> usize {
        self.faults().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Entry point of every gateway call.
    pub(super) async fn enter(&self, op: Operation) -> Result<()> {
        let (fails, delay) = {
            let mut faults = self.faults();
            let call = {
                let calls = faults.calls.entry(op).or_insert(0);
                *calls += 1;
                *calls
            };
            let fails = faults
                .scheduled
                .get_mut(&op)
                .is_some_and(|calls| calls.remove(&call));
            (fails, faults.delays.get(&op).copied())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fails {
            tracing::debug!("[InMemoryBackend] Injected failure for {:?}", op);
            return Err(HuddleError::data_access(format!(
                "Injected failure for {:?}",
                op
            )));
        }
        Ok(())
    }

    // Seeding

    pub async fn seed_workspace(&self, workspace: Workspace) {
        self.tables.write().await.workspaces.push(workspace);
    }

    pub async fn seed_workspace_member(&self, workspace_id: &str, user_id: &str, role: WorkspaceRole) {
        self.tables.write().await.workspace_members.push(WorkspaceMember {
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: Utc::now(),
        });
    }

    pub async fn seed_profile(&self, profile: Profile) {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id.clone(), profile);
    }

    pub async fn seed_task(&self, task: Task) {
        self.tables.write().await.tasks.push(task);
    }

    pub async fn seed_conversation(&self, conversation: Conversation) {
        self.tables.write().await.conversations.push(conversation);
    }

    pub async fn seed_message(&self, message: Message) {
        self.tables.write().await.messages.push(message);
    }

    // Inspection

    pub async fn task(&self, task_id: &str) -> Option<Task> {
        self.tables
            .read()
            .await
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    pub async fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        self.tables
            .read()
            .await
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned()
    }

    pub async fn messages_in(&self, conversation_id: &str) -> Vec<Message> {
        self.tables
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub async fn members_of(&self, conversation_id: &str) -> Vec<ConversationMember> {
        self.conversation(conversation_id)
            .await
            .map(|c| c.members)
            .unwrap_or_default()
    }

    pub async fn role_in(&self, conversation_id: &str, user_id: &str) -> Option<MemberRole> {
        self.conversation(conversation_id)
            .await
            .and_then(|c| c.role_of(user_id))
    }

    /// Publishes a message row change as if another client had written it.
    pub async fn push_remote_message(&self, message: Message) {
        let conversation_id = message.conversation_id.clone();
        self.tables.write().await.messages.push(message.clone());
        self.hub.publish_message(
            &conversation_id,
            huddle_core::realtime::ChangeEvent::Inserted { record: message },
        );
    }
}
