//! Conversation creation and group management.
//!
//! Every mutating group action is authorized against the role matrix before
//! any request is issued. Conversations the service has listed, created or
//! been handed are authorized from that copy without a read; an action that
//! gets past authorization drops the copy so the next one reads fresh roles. Ownership transfer spans three writes and runs as
//! a compensating sequence: a failed step undoes the steps already applied,
//! in reverse order.

use huddle_core::chat::{
    Conversation, ConversationRepository, GroupAction, MemberRole, NewConversation, authorize,
    authorize_removal,
};
use huddle_core::error::{HuddleError, Result};
use huddle_core::notification::{Notification, Notifier};
use huddle_core::workspace::WorkspaceRepository;
use huddle_core::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One write of the ownership transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferStep {
    DemoteOwner,
    PromoteTarget,
    UpdateCreator,
}

const TRANSFER_STEPS: [TransferStep; 3] = [
    TransferStep::DemoteOwner,
    TransferStep::PromoteTarget,
    TransferStep::UpdateCreator,
];

/// What an ownership transfer needs to apply and undo its steps.
struct Transfer<'a> {
    conversation_id: &'a str,
    owner_id: &'a str,
    target_id: &'a str,
    target_role: MemberRole,
    previous_creator: &'a str,
}

pub struct ConversationService {
    ctx: Arc<SessionContext>,
    conversations: Arc<dyn ConversationRepository>,
    workspaces: Arc<dyn WorkspaceRepository>,
    notifier: Arc<dyn Notifier>,
    known: RwLock<HashMap<String, Conversation>>,
}

impl ConversationService {
    pub fn new(
        ctx: SessionContext,
        conversations: Arc<dyn ConversationRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ctx: Arc::new(ctx),
            conversations,
            workspaces,
            notifier,
            known: RwLock::new(HashMap::new()),
        }
    }

    /// Notifies on failure and passes the result through.
    fn report<T>(&self, result: Result<T>, generic: &str) -> Result<T> {
        if let Err(e) = &result {
            self.notifier
                .notify(Notification::error(e.user_message(generic)));
        }
        result
    }

    fn succeed(&self, message: &str) {
        self.notifier.notify(Notification::success(message));
    }

    /// Keeps `conversation` for authorizing later group actions, e.g. the
    /// copy an open chat view already holds.
    pub async fn remember(&self, conversation: Conversation) {
        self.known
            .write()
            .await
            .insert(conversation.id.clone(), conversation);
    }

    async fn load(&self, conversation_id: &str) -> Result<Conversation> {
        if let Some(known) = self.known.read().await.get(conversation_id) {
            return Ok(known.clone());
        }
        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| HuddleError::not_found("Conversation", conversation_id))?;
        self.remember(conversation.clone()).await;
        Ok(conversation)
    }

    /// Drops the kept copy unless the action was refused up front.
    async fn settle<T>(&self, conversation_id: &str, result: &Result<T>) {
        if !matches!(result, Err(e) if e.is_permission_denied()) {
            self.known.write().await.remove(conversation_id);
        }
    }

    /// Conversations of the current user in the current workspace, most
    /// recent activity first.
    pub async fn list(&self) -> Result<Vec<Conversation>> {
        let result = self
            .conversations
            .list_for_user(&self.ctx.workspace_id, self.ctx.user_id())
            .await;
        if let Ok(conversations) = &result {
            let mut known = self.known.write().await;
            known.clear();
            for conversation in conversations {
                known.insert(conversation.id.clone(), conversation.clone());
            }
        }
        self.report(result, "Failed to load conversations")
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Creates a group owned by the current user.
    pub async fn create_group(&self, name: &str, member_ids: &[String]) -> Result<Conversation> {
        let result = self.try_create_group(name, member_ids).await;
        if let Ok(created) = &result {
            self.remember(created.clone()).await;
            self.succeed("Group created");
        }
        self.report(result, "Failed to create group")
    }

    async fn try_create_group(&self, name: &str, member_ids: &[String]) -> Result<Conversation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HuddleError::validation("Group name is required"));
        }

        let me = self.ctx.user_id();
        let mut others: Vec<String> = member_ids
            .iter()
            .filter(|id| id.as_str() != me)
            .cloned()
            .collect();
        others.sort();
        others.dedup();
        if others.is_empty() {
            return Err(HuddleError::validation("Select at least one member"));
        }
        for id in &others {
            if !self.workspaces.is_member(&self.ctx.workspace_id, id).await? {
                return Err(HuddleError::validation(
                    "All members must belong to this workspace",
                ));
            }
        }

        let mut members = vec![(me.to_string(), MemberRole::Owner)];
        members.extend(others.into_iter().map(|id| (id, MemberRole::Member)));

        let created = self
            .conversations
            .create(&NewConversation {
                workspace_id: self.ctx.workspace_id.clone(),
                is_group: true,
                name: Some(name.to_string()),
                created_by: me.to_string(),
                members,
            })
            .await?;
        tracing::info!("[ConversationService] Created group {} ({})", created.id, name);
        Ok(created)
    }

    /// Returns the direct conversation with `other_id`, creating it if
    /// needed.
    pub async fn open_direct(&self, other_id: &str) -> Result<Conversation> {
        let result = self.try_open_direct(other_id).await;
        if let Ok(conversation) = &result {
            self.remember(conversation.clone()).await;
        }
        self.report(result, "Failed to open conversation")
    }

    async fn try_open_direct(&self, other_id: &str) -> Result<Conversation> {
        let me = self.ctx.user_id();
        if other_id == me {
            return Err(HuddleError::validation(
                "Cannot start a conversation with yourself",
            ));
        }
        if let Some(existing) = self
            .conversations
            .find_direct(&self.ctx.workspace_id, me, other_id)
            .await?
        {
            return Ok(existing);
        }
        if !self.workspaces.is_member(&self.ctx.workspace_id, other_id).await? {
            return Err(HuddleError::validation(
                "All members must belong to this workspace",
            ));
        }

        self.conversations
            .create(&NewConversation {
                workspace_id: self.ctx.workspace_id.clone(),
                is_group: false,
                name: None,
                created_by: me.to_string(),
                members: vec![
                    (me.to_string(), MemberRole::Member),
                    (other_id.to_string(), MemberRole::Member),
                ],
            })
            .await
    }

    // ------------------------------------------------------------------
    // Group management
    // ------------------------------------------------------------------

    pub async fn rename(&self, conversation_id: &str, name: &str) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            authorize(&conversation, self.ctx.user_id(), GroupAction::Rename)?;
            let name = name.trim();
            if name.is_empty() {
                return Err(HuddleError::validation("Group name is required"));
            }
            self.conversations.rename(conversation_id, name).await
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("Group renamed");
        }
        self.report(result, "Failed to rename group")
    }

    pub async fn add_members(&self, conversation_id: &str, user_ids: &[String]) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            authorize(&conversation, self.ctx.user_id(), GroupAction::AddMembers)?;
            let mut new_ids: Vec<String> = user_ids
                .iter()
                .filter(|id| !conversation.is_member(id))
                .cloned()
                .collect();
            new_ids.sort();
            new_ids.dedup();
            if new_ids.is_empty() {
                return Err(HuddleError::validation("Select at least one member"));
            }
            for id in &new_ids {
                if !self.workspaces.is_member(&self.ctx.workspace_id, id).await? {
                    return Err(HuddleError::validation(
                        "All members must belong to this workspace",
                    ));
                }
            }
            self.conversations.add_members(conversation_id, &new_ids).await
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("Members added");
        }
        self.report(result, "Failed to add members")
    }

    pub async fn remove_member(&self, conversation_id: &str, target_id: &str) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            authorize_removal(&conversation, self.ctx.user_id(), target_id)?;
            self.conversations
                .remove_member(conversation_id, target_id)
                .await
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("Member removed");
        }
        self.report(result, "Failed to remove member")
    }

    pub async fn promote_to_admin(&self, conversation_id: &str, target_id: &str) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            authorize(&conversation, self.ctx.user_id(), GroupAction::PromoteToAdmin)?;
            match conversation.role_of(target_id) {
                None => Err(HuddleError::not_found("ConversationMember", target_id)),
                Some(MemberRole::Member) => {
                    self.conversations
                        .set_member_role(conversation_id, target_id, MemberRole::Admin)
                        .await
                }
                Some(_) => Err(HuddleError::validation(
                    "Only members can be promoted to admin",
                )),
            }
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("Member promoted to admin");
        }
        self.report(result, "Failed to promote member")
    }

    /// Hands the group over to `target_id`.
    ///
    /// The current owner becomes an admin, the target becomes the owner and
    /// the creator reference follows. If a step fails, the applied steps are
    /// undone; if undoing fails too, `HuddleError::Inconsistent` is returned.
    pub async fn transfer_ownership(&self, conversation_id: &str, target_id: &str) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            let me = self.ctx.user_id();
            authorize(&conversation, me, GroupAction::TransferOwnership)?;
            if target_id == me {
                return Err(HuddleError::validation(
                    "Select another member to transfer ownership to",
                ));
            }
            let target_role = conversation
                .role_of(target_id)
                .ok_or_else(|| HuddleError::not_found("ConversationMember", target_id))?;

            let transfer = Transfer {
                conversation_id,
                owner_id: me,
                target_id,
                target_role,
                previous_creator: &conversation.created_by,
            };
            self.run_transfer(&transfer).await
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("Ownership transferred");
        }
        self.report(result, "Failed to transfer ownership")
    }

    async fn run_transfer(&self, transfer: &Transfer<'_>) -> Result<()> {
        let mut applied: Vec<TransferStep> = Vec::with_capacity(TRANSFER_STEPS.len());

        for step in TRANSFER_STEPS {
            if let Err(e) = self.apply_step(transfer, step).await {
                tracing::warn!(
                    "[ConversationService] Transfer of {} failed at {:?}: {}",
                    transfer.conversation_id,
                    step,
                    e
                );
                self.compensate(transfer, &applied).await?;
                return Err(e);
            }
            applied.push(step);
        }

        tracing::info!(
            "[ConversationService] Ownership of {} moved {} -> {}",
            transfer.conversation_id,
            transfer.owner_id,
            transfer.target_id
        );
        Ok(())
    }

    async fn apply_step(&self, transfer: &Transfer<'_>, step: TransferStep) -> Result<()> {
        let id = transfer.conversation_id;
        match step {
            TransferStep::DemoteOwner => {
                self.conversations
                    .set_member_role(id, transfer.owner_id, MemberRole::Admin)
                    .await
            }
            TransferStep::PromoteTarget => {
                self.conversations
                    .set_member_role(id, transfer.target_id, MemberRole::Owner)
                    .await
            }
            TransferStep::UpdateCreator => {
                self.conversations.set_creator(id, transfer.target_id).await
            }
        }
    }

    async fn undo_step(&self, transfer: &Transfer<'_>, step: TransferStep) -> Result<()> {
        let id = transfer.conversation_id;
        match step {
            TransferStep::DemoteOwner => {
                self.conversations
                    .set_member_role(id, transfer.owner_id, MemberRole::Owner)
                    .await
            }
            TransferStep::PromoteTarget => {
                self.conversations
                    .set_member_role(id, transfer.target_id, transfer.target_role)
                    .await
            }
            TransferStep::UpdateCreator => {
                self.conversations
                    .set_creator(id, transfer.previous_creator)
                    .await
            }
        }
    }

    async fn compensate(&self, transfer: &Transfer<'_>, applied: &[TransferStep]) -> Result<()> {
        for step in applied.iter().rev() {
            if let Err(e) = self.undo_step(transfer, *step).await {
                tracing::error!(
                    "[ConversationService] Could not undo {:?} on {}: {}",
                    step,
                    transfer.conversation_id,
                    e
                );
                return Err(HuddleError::Inconsistent(format!(
                    "ownership transfer of {} left partially applied: undoing {:?} failed: {}",
                    transfer.conversation_id, step, e
                )));
            }
        }
        Ok(())
    }

    /// Deletes the group with its members and messages.
    pub async fn delete_group(&self, conversation_id: &str) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            authorize(&conversation, self.ctx.user_id(), GroupAction::Delete)?;
            self.conversations.delete(conversation_id).await
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("Group deleted");
        }
        self.report(result, "Failed to delete group")
    }

    /// Leaves a group. The owner has to transfer or delete first.
    pub async fn leave(&self, conversation_id: &str) -> Result<()> {
        let result = async {
            let conversation = self.load(conversation_id).await?;
            authorize(&conversation, self.ctx.user_id(), GroupAction::Leave)?;
            self.conversations
                .remove_member(conversation_id, self.ctx.user_id())
                .await
        }
        .await;
        self.settle(conversation_id, &result).await;
        if result.is_ok() {
            self.succeed("You left the group");
        }
        self.report(result, "Failed to leave group")
    }
}
