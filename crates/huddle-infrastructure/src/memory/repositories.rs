//! Gateway trait implementations for [`InMemoryBackend`].
//!
//! Mutations publish the matching row change on the hub, the same way the
//! hosted store emits change events after a commit.

use super::backend::{InMemoryBackend, Operation};
use crate::rest::sort_by_activity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use huddle_core::chat::{
    Conversation, ConversationMember, ConversationRepository, MemberRole, Message,
    MessageRepository, NewConversation, NewMessage,
};
use huddle_core::error::{HuddleError, Result};
use huddle_core::presence::{PresenceEntry, PresenceEvent};
use huddle_core::realtime::{ChangeEvent, RealtimeGateway, Subscription, TypingSignal};
use huddle_core::task::{NewTask, Task, TaskComment, TaskRepository, TaskStatus};
use huddle_core::workspace::{
    Profile, ProfileRepository, Workspace, WorkspaceMember, WorkspaceRepository,
};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl InMemoryBackend {
    /// Applies `mutate` to a task and publishes the updated row.
    async fn mutate_task<F>(&self, task_id: &str, mutate: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let updated = {
            let mut tables = self.tables.write().await;
            let task = tables
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| HuddleError::not_found("Task", task_id))?;
            mutate(task);
            task.updated_at = Utc::now();
            task.clone()
        };
        self.hub.publish_task(
            &updated.workspace_id,
            ChangeEvent::Updated {
                record: updated.clone(),
            },
        );
        Ok(updated)
    }

    async fn mutate_conversation<F>(&self, conversation_id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Conversation) -> Result<()>,
    {
        let mut tables = self.tables.write().await;
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| HuddleError::not_found("Conversation", conversation_id))?;
        mutate(conversation)
    }
}

#[async_trait]
impl TaskRepository for InMemoryBackend {
    async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>> {
        self.enter(Operation::ListTasks).await?;
        let mut tasks: Vec<Task> = self
            .tables
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        self.enter(Operation::FindTask).await?;
        Ok(self.task(task_id).await)
    }

    async fn insert(&self, task: &NewTask) -> Result<Task> {
        self.enter(Operation::InsertTask).await?;
        let now = Utc::now();
        let created = Task {
            id: new_id(),
            workspace_id: task.workspace_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            assignee_id: task.assignee_id.clone(),
            due_date: task.due_date,
            created_by: task.created_by.clone(),
            created_at: now,
            updated_at: now,
            attachment_count: 0,
            comment_count: 0,
        };
        self.tables.write().await.tasks.push(created.clone());
        self.hub.publish_task(
            &created.workspace_id,
            ChangeEvent::Inserted {
                record: created.clone(),
            },
        );
        Ok(created)
    }

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
        self.enter(Operation::UpdateTaskStatus).await?;
        self.mutate_task(task_id, |task| task.status = status).await
    }

    async fn update_description(&self, task_id: &str, description: Option<&str>) -> Result<Task> {
        self.enter(Operation::UpdateTaskDescription).await?;
        let description = description.map(str::to_string);
        self.mutate_task(task_id, |task| task.description = description)
            .await
    }

    async fn add_comment(&self, task_id: &str, user_id: &str, content: &str) -> Result<TaskComment> {
        self.enter(Operation::AddComment).await?;
        let comment = TaskComment {
            id: new_id(),
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        // Comment inserts do not touch the task row, so no task change is published.
        let mut tables = self.tables.write().await;
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| HuddleError::not_found("Task", task_id))?;
        task.comment_count += 1;
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: &str) -> Result<Vec<TaskComment>> {
        self.enter(Operation::ListComments).await?;
        Ok(self
            .tables
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MessageRepository for InMemoryBackend {
    async fn list_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        self.enter(Operation::ListMessages).await?;
        let mut messages = self.messages_in(conversation_id).await;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn insert(&self, message: &NewMessage) -> Result<Message> {
        self.enter(Operation::InsertMessage).await?;
        let stored = {
            let mut tables = self.tables.write().await;
            let conversation = tables
                .conversations
                .iter()
                .find(|c| c.id == message.conversation_id)
                .ok_or_else(|| HuddleError::not_found("Conversation", &message.conversation_id))?;
            if !conversation.is_member(&message.sender_id) {
                return Err(HuddleError::permission_denied(
                    "You are not a member of this conversation",
                ));
            }

            let stored = Message {
                id: new_id(),
                conversation_id: message.conversation_id.clone(),
                sender_id: message.sender_id.clone(),
                content: message.content.clone(),
                created_at: Utc::now(),
                read_by: message.read_by.clone(),
            };
            tables.messages.push(stored.clone());
            stored
        };
        self.hub.publish_message(
            &stored.conversation_id,
            ChangeEvent::Inserted {
                record: stored.clone(),
            },
        );
        Ok(stored)
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        self.enter(Operation::DeleteMessage).await?;
        let removed = {
            let mut tables = self.tables.write().await;
            let position = tables.messages.iter().position(|m| m.id == message_id);
            position.map(|index| tables.messages.remove(index))
        };
        if let Some(message) = removed {
            self.hub.publish_message(
                &message.conversation_id,
                ChangeEvent::Deleted { id: message.id },
            );
        }
        Ok(())
    }

    async fn mark_read(&self, message_id: &str, user_id: &str) -> Result<()> {
        self.enter(Operation::MarkRead).await?;
        let updated = {
            let mut tables = self.tables.write().await;
            let message = tables
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| HuddleError::not_found("Message", message_id))?;
            if message.read_by.iter().any(|id| id == user_id) {
                return Ok(());
            }
            message.read_by.push(user_id.to_string());
            message.clone()
        };
        self.hub.publish_message(
            &updated.conversation_id.clone(),
            ChangeEvent::Updated { record: updated },
        );
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryBackend {
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.enter(Operation::FindConversation).await?;
        Ok(self.conversation(conversation_id).await)
    }

    async fn list_for_user(&self, workspace_id: &str, user_id: &str) -> Result<Vec<Conversation>> {
        self.enter(Operation::ListConversations).await?;
        let mut conversations: Vec<Conversation> = self
            .tables
            .read()
            .await
            .conversations
            .iter()
            .filter(|c| c.workspace_id == workspace_id && c.is_member(user_id))
            .cloned()
            .collect();
        sort_by_activity(&mut conversations);
        Ok(conversations)
    }

    async fn find_direct(
        &self,
        workspace_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>> {
        self.enter(Operation::ListConversations).await?;
        Ok(self
            .tables
            .read()
            .await
            .conversations
            .iter()
            .find(|c| {
                c.workspace_id == workspace_id
                    && !c.is_group
                    && c.is_member(user_a)
                    && c.is_member(user_b)
            })
            .cloned())
    }

    async fn create(&self, conversation: &NewConversation) -> Result<Conversation> {
        self.enter(Operation::CreateConversation).await?;
        let id = new_id();
        let now = Utc::now();
        let created = Conversation {
            id: id.clone(),
            workspace_id: conversation.workspace_id.clone(),
            is_group: conversation.is_group,
            name: conversation.name.clone(),
            created_by: conversation.created_by.clone(),
            last_message: None,
            last_message_at: None,
            created_at: now,
            members: conversation
                .members
                .iter()
                .map(|(user_id, role)| ConversationMember {
                    conversation_id: id.clone(),
                    user_id: user_id.clone(),
                    role: *role,
                    joined_at: now,
                })
                .collect(),
        };
        self.tables
            .write()
            .await
            .conversations
            .push(created.clone());
        Ok(created)
    }

    async fn rename(&self, conversation_id: &str, name: &str) -> Result<()> {
        self.enter(Operation::RenameConversation).await?;
        self.mutate_conversation(conversation_id, |c| {
            c.name = Some(name.to_string());
            Ok(())
        })
        .await
    }

    async fn update_last_message(
        &self,
        conversation_id: &str,
        preview: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.enter(Operation::UpdateLastMessage).await?;
        self.mutate_conversation(conversation_id, |c| {
            c.last_message = Some(preview.to_string());
            c.last_message_at = Some(at);
            Ok(())
        })
        .await
    }

    async fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<()> {
        self.enter(Operation::AddMembers).await?;
        self.mutate_conversation(conversation_id, |c| {
            let now = Utc::now();
            for user_id in user_ids {
                if !c.is_member(user_id) {
                    c.members.push(ConversationMember {
                        conversation_id: c.id.clone(),
                        user_id: user_id.clone(),
                        role: MemberRole::Member,
                        joined_at: now,
                    });
                }
            }
            Ok(())
        })
        .await
    }

    async fn remove_member(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        self.enter(Operation::RemoveMember).await?;
        self.mutate_conversation(conversation_id, |c| {
            c.members.retain(|m| m.user_id != user_id);
            Ok(())
        })
        .await
    }

    async fn set_member_role(
        &self,
        conversation_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<()> {
        self.enter(Operation::SetMemberRole).await?;
        self.mutate_conversation(conversation_id, |c| {
            let member = c
                .members
                .iter_mut()
                .find(|m| m.user_id == user_id)
                .ok_or_else(|| HuddleError::not_found("ConversationMember", user_id))?;
            member.role = role;
            Ok(())
        })
        .await
    }

    async fn set_creator(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        self.enter(Operation::SetCreator).await?;
        self.mutate_conversation(conversation_id, |c| {
            c.created_by = user_id.to_string();
            Ok(())
        })
        .await
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.enter(Operation::DeleteConversation).await?;
        let mut tables = self.tables.write().await;
        tables
            .messages
            .retain(|m| m.conversation_id != conversation_id);
        tables.conversations.retain(|c| c.id != conversation_id);
        Ok(())
    }
}

#[async_trait]
impl WorkspaceRepository for InMemoryBackend {
    async fn find_by_id(&self, workspace_id: &str) -> Result<Option<Workspace>> {
        self.enter(Operation::FindWorkspace).await?;
        Ok(self
            .tables
            .read()
            .await
            .workspaces
            .iter()
            .find(|w| w.id == workspace_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workspace>> {
        self.enter(Operation::ListWorkspaces).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .workspaces
            .iter()
            .filter(|w| {
                tables
                    .workspace_members
                    .iter()
                    .any(|m| m.workspace_id == w.id && m.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn find_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<WorkspaceMember>> {
        self.enter(Operation::FindWorkspaceMember).await?;
        Ok(self
            .tables
            .read()
            .await
            .workspace_members
            .iter()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMember>> {
        self.enter(Operation::ListWorkspaceMembers).await?;
        Ok(self
            .tables
            .read()
            .await
            .workspace_members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<Profile>> {
        self.enter(Operation::FindProfile).await?;
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn find_many(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        self.enter(Operation::FindProfile).await?;
        let tables = self.tables.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl RealtimeGateway for InMemoryBackend {
    async fn subscribe_tasks(&self, workspace_id: &str) -> Result<Subscription<ChangeEvent<Task>>> {
        self.enter(Operation::Subscribe).await?;
        Ok(self.hub.subscribe_tasks(workspace_id))
    }

    async fn subscribe_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Subscription<ChangeEvent<Message>>> {
        self.enter(Operation::Subscribe).await?;
        Ok(self.hub.subscribe_messages(conversation_id))
    }

    async fn join_presence(
        &self,
        workspace_id: &str,
        entry: PresenceEntry,
    ) -> Result<Subscription<PresenceEvent>> {
        self.enter(Operation::Subscribe).await?;
        Ok(self.hub.join_presence(workspace_id, entry))
    }

    async fn leave_presence(&self, workspace_id: &str, user_id: &str) -> Result<()> {
        self.hub.leave_presence(workspace_id, user_id);
        Ok(())
    }

    async fn send_typing(&self, signal: TypingSignal) -> Result<()> {
        self.enter(Operation::SendTyping).await?;
        self.hub.publish_typing(signal);
        Ok(())
    }

    async fn subscribe_typing(&self, conversation_id: &str) -> Result<Subscription<TypingSignal>> {
        self.enter(Operation::Subscribe).await?;
        Ok(self.hub.subscribe_typing(conversation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::workspace::WorkspaceRole;

    fn direct(id: &str, a: &str, b: &str) -> Conversation {
        let now = Utc::now();
        let member = |user_id: &str| ConversationMember {
            conversation_id: id.to_string(),
            user_id: user_id.to_string(),
            role: MemberRole::Member,
            joined_at: now,
        };
        Conversation {
            id: id.to_string(),
            workspace_id: "w1".to_string(),
            is_group: false,
            name: None,
            created_by: a.to_string(),
            last_message: None,
            last_message_at: None,
            created_at: now,
            members: vec![member(a), member(b)],
        }
    }

    #[tokio::test]
    async fn test_message_insert_publishes_echo() {
        let backend = InMemoryBackend::new();
        backend.seed_conversation(direct("c1", "u1", "u2")).await;
        let mut rx = RealtimeGateway::subscribe_messages(&backend, "c1").await.unwrap();

        let stored = MessageRepository::insert(&backend, &NewMessage::new("c1", "u1", "hi"))
            .await
            .unwrap();

        match rx.recv().await {
            Some(ChangeEvent::Inserted { record }) => assert_eq!(record.id, stored.id),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(stored.read_by, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn test_non_member_cannot_insert_message() {
        let backend = InMemoryBackend::new();
        backend.seed_conversation(direct("c1", "u1", "u2")).await;

        let err = MessageRepository::insert(&backend, &NewMessage::new("c1", "u3", "hi"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_delete_conversation_cascades_messages() {
        let backend = InMemoryBackend::new();
        backend.seed_conversation(direct("c1", "u1", "u2")).await;
        MessageRepository::insert(&backend, &NewMessage::new("c1", "u1", "hi"))
            .await
            .unwrap();

        ConversationRepository::delete(&backend, "c1").await.unwrap();

        assert!(backend.conversation("c1").await.is_none());
        assert!(backend.messages_in("c1").await.is_empty());
    }

    #[tokio::test]
    async fn test_find_direct_matches_either_order() {
        let backend = InMemoryBackend::new();
        backend.seed_conversation(direct("c1", "u1", "u2")).await;

        let found = backend.find_direct("w1", "u2", "u1").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some("c1".to_string()));
    }

    #[tokio::test]
    async fn test_workspace_membership() {
        let backend = InMemoryBackend::new();
        backend
            .seed_workspace_member("w1", "u1", WorkspaceRole::Admin)
            .await;

        assert!(backend.is_member("w1", "u1").await.unwrap());
        assert!(!backend.is_member("w1", "u2").await.unwrap());
    }
}
