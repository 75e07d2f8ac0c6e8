//! REST-backed conversation and message gateways.

use super::client::{Query, RestClient};
use super::dto::{CONVERSATION_SELECT, ConversationRow, NewConversationRow, NewMemberRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use huddle_core::chat::{
    Conversation, ConversationMember, ConversationRepository, MemberRole, Message,
    MessageRepository, NewConversation, NewMessage,
};
use huddle_core::error::{HuddleError, Result};
use serde_json::json;
use std::sync::Arc;

const MESSAGES: &str = "messages";
const CONVERSATIONS: &str = "conversations";
const CONVERSATION_MEMBERS: &str = "conversation_members";

/// Message gateway over the `messages` table.
pub struct RestMessageRepository {
    client: Arc<RestClient>,
}

impl RestMessageRepository {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageRepository for RestMessageRepository {
    async fn list_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let query = Query::table(MESSAGES)
            .eq("conversation_id", conversation_id)
            .order("created_at", true);
        self.client.select(&query).await
    }

    async fn insert(&self, message: &NewMessage) -> Result<Message> {
        let rows: Vec<Message> = self.client.insert(MESSAGES, message).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| HuddleError::data_access("Message insert returned no row"))
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        self.client
            .delete(&Query::table(MESSAGES).eq("id", message_id))
            .await
    }

    async fn mark_read(&self, message_id: &str, user_id: &str) -> Result<()> {
        let query = Query::table(MESSAGES).eq("id", message_id);
        let message: Message = self
            .client
            .select_one(&query)
            .await?
            .ok_or_else(|| HuddleError::not_found("Message", message_id))?;

        if message.read_by.iter().any(|id| id == user_id) {
            return Ok(());
        }

        let mut read_by = message.read_by;
        read_by.push(user_id.to_string());
        let _: Vec<Message> = self
            .client
            .update(&query, &json!({ "read_by": read_by }))
            .await?;
        Ok(())
    }
}

/// Conversation gateway over `conversations` and `conversation_members`.
pub struct RestConversationRepository {
    client: Arc<RestClient>,
}

impl RestConversationRepository {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    async fn patch(&self, conversation_id: &str, body: serde_json::Value) -> Result<()> {
        let query = Query::table(CONVERSATIONS).eq("id", conversation_id);
        let rows: Vec<ConversationRow> = self.client.update(&query, &body).await?;
        if rows.is_empty() {
            return Err(HuddleError::not_found("Conversation", conversation_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for RestConversationRepository {
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let query = Query::table(CONVERSATIONS)
            .select(CONVERSATION_SELECT)
            .eq("id", conversation_id);
        let row: Option<ConversationRow> = self.client.select_one(&query).await?;
        Ok(row.map(Conversation::from))
    }

    async fn list_for_user(&self, workspace_id: &str, user_id: &str) -> Result<Vec<Conversation>> {
        let memberships: Vec<ConversationMember> = self
            .client
            .select(&Query::table(CONVERSATION_MEMBERS).eq("user_id", user_id))
            .await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = memberships.into_iter().map(|m| m.conversation_id).collect();
        let query = Query::table(CONVERSATIONS)
            .select(CONVERSATION_SELECT)
            .eq("workspace_id", workspace_id)
            .in_list("id", &ids);
        let rows: Vec<ConversationRow> = self.client.select(&query).await?;

        let mut conversations: Vec<Conversation> = rows.into_iter().map(Conversation::from).collect();
        sort_by_activity(&mut conversations);
        Ok(conversations)
    }

    async fn find_direct(
        &self,
        workspace_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>> {
        let conversations = self.list_for_user(workspace_id, user_a).await?;
        Ok(conversations
            .into_iter()
            .find(|c| !c.is_group && c.is_member(user_b)))
    }

    async fn create(&self, conversation: &NewConversation) -> Result<Conversation> {
        let row = NewConversationRow {
            workspace_id: &conversation.workspace_id,
            is_group: conversation.is_group,
            name: conversation.name.as_deref(),
            created_by: &conversation.created_by,
        };
        let created: Vec<ConversationRow> = self.client.insert(CONVERSATIONS, &row).await?;
        let created = created
            .into_iter()
            .next()
            .ok_or_else(|| HuddleError::data_access("Conversation insert returned no row"))?;

        let members: Vec<NewMemberRow> = conversation
            .members
            .iter()
            .map(|(user_id, role)| NewMemberRow {
                conversation_id: &created.id,
                user_id,
                role: *role,
            })
            .collect();

        if let Err(e) = self
            .client
            .insert::<_, ConversationMember>(CONVERSATION_MEMBERS, &members)
            .await
        {
            tracing::warn!(
                "[RestConversationRepository] Member insert failed, removing conversation {}",
                created.id
            );
            let cleanup = self
                .client
                .delete(&Query::table(CONVERSATIONS).eq("id", &created.id))
                .await;
            return Err(member_insert_failure(&created.id, e, cleanup));
        }

        self.find_by_id(&created.id)
            .await?
            .ok_or_else(|| HuddleError::not_found("Conversation", created.id))
    }

    async fn rename(&self, conversation_id: &str, name: &str) -> Result<()> {
        self.patch(conversation_id, json!({ "name": name })).await
    }

    async fn update_last_message(
        &self,
        conversation_id: &str,
        preview: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.patch(
            conversation_id,
            json!({ "last_message": preview, "last_message_at": at }),
        )
        .await
    }

    async fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<()> {
        let rows: Vec<NewMemberRow> = user_ids
            .iter()
            .map(|user_id| NewMemberRow {
                conversation_id,
                user_id,
                role: MemberRole::Member,
            })
            .collect();
        let _: Vec<ConversationMember> = self.client.insert(CONVERSATION_MEMBERS, &rows).await?;
        Ok(())
    }

    async fn remove_member(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let query = Query::table(CONVERSATION_MEMBERS)
            .eq("conversation_id", conversation_id)
            .eq("user_id", user_id);
        self.client.delete(&query).await
    }

    async fn set_member_role(
        &self,
        conversation_id: &str,
        user_id: &str,
        role: MemberRole,
    ) -> Result<()> {
        let query = Query::table(CONVERSATION_MEMBERS)
            .eq("conversation_id", conversation_id)
            .eq("user_id", user_id);
        let rows: Vec<ConversationMember> = self.client.update(&query, &json!({ "role": role })).await?;
        if rows.is_empty() {
            return Err(HuddleError::not_found("ConversationMember", user_id));
        }
        Ok(())
    }

    async fn set_creator(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        self.patch(conversation_id, json!({ "created_by": user_id })).await
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        // Children first so a partial failure never leaves orphaned rows.
        self.client
            .delete(&Query::table(MESSAGES).eq("conversation_id", conversation_id))
            .await?;
        self.client
            .delete(&Query::table(CONVERSATION_MEMBERS).eq("conversation_id", conversation_id))
            .await?;
        self.client
            .delete(&Query::table(CONVERSATIONS).eq("id", conversation_id))
            .await
    }
}

/// Most recent activity first. A conversation without messages counts its
/// creation as its latest activity.
/// Error for a conversation whose members could not be stored. A failed
/// cleanup leaves a conversation without members behind.
fn member_insert_failure(conversation_id: &str, err: HuddleError, cleanup: Result<()>) -> HuddleError {
    match cleanup {
        Ok(()) => err,
        Err(cleanup_err) => {
            tracing::error!(
                "[RestConversationRepository] Conversation {} left without members: {}",
                conversation_id,
                cleanup_err
            );
            HuddleError::Inconsistent(format!(
                "Conversation {} was created without members ({}) and could not be removed ({})",
                conversation_id, err, cleanup_err
            ))
        }
    }
}

pub(crate) fn sort_by_activity(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        let a_key = a.last_message_at.unwrap_or(a.created_at);
        let b_key = b.last_message_at.unwrap_or(b.created_at);
        b_key.cmp(&a_key)
    });
}
