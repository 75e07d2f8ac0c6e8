//! Group management authorization.
//!
//! Every mutating group action is checked here before a request is issued.
//! The backing store stays the final authority.

use super::model::{Conversation, MemberRole};
use crate::error::{HuddleError, Result};

/// Group management actions subject to the role matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupAction {
    Rename,
    AddMembers,
    RemoveMember,
    PromoteToAdmin,
    TransferOwnership,
    Delete,
    Leave,
}

impl GroupAction {
    /// Message shown when the action is refused.
    pub fn denial_message(&self) -> &'static str {
        match self {
            GroupAction::Rename => "Only the group owner can rename the group",
            GroupAction::AddMembers => "Only group admins can add members",
            GroupAction::RemoveMember => "Only group admins can remove members",
            GroupAction::PromoteToAdmin => "Only the group owner can promote members to admin",
            GroupAction::TransferOwnership => "Only the group owner can transfer ownership",
            GroupAction::Delete => "Only the group owner can delete the group",
            GroupAction::Leave => "Transfer ownership or delete the group before leaving",
        }
    }
}

/// The role matrix.
///
/// | Action | Owner | Admin | Member |
/// |---|---|---|---|
/// | Rename, Promote, Transfer, Delete | yes | no | no |
/// | Add members, Remove member | yes | yes | no |
/// | Leave | no | yes | yes |
pub fn is_allowed(role: MemberRole, action: GroupAction) -> bool {
    use GroupAction::*;
    use MemberRole::*;

    match (action, role) {
        (Rename | PromoteToAdmin | TransferOwnership | Delete, Owner) => true,
        (Rename | PromoteToAdmin | TransferOwnership | Delete, Admin | Member) => false,
        (AddMembers | RemoveMember, Owner | Admin) => true,
        (AddMembers | RemoveMember, Member) => false,
        (Leave, Owner) => false,
        (Leave, Admin | Member) => true,
    }
}

/// Checks that `actor_id` may perform `action` on `conversation`.
///
/// # Returns
///
/// - `Ok(MemberRole)`: The actor's role, action allowed
/// - `Err(Validation)`: The conversation is not a group
/// - `Err(PermissionDenied)`: The actor is not a member or lacks the role
pub fn authorize(conversation: &Conversation, actor_id: &str, action: GroupAction) -> Result<MemberRole> {
    if !conversation.is_group {
        return Err(HuddleError::validation(
            "This action is only available in group conversations",
        ));
    }

    let role = conversation.role_of(actor_id).ok_or_else(|| {
        HuddleError::permission_denied("You are not a member of this conversation")
    })?;

    if is_allowed(role, action) {
        Ok(role)
    } else {
        Err(HuddleError::permission_denied(action.denial_message()))
    }
}

/// Checks that `actor_id` may remove `target_id` from `conversation`.
///
/// The owner can never be removed, by anyone.
pub fn authorize_removal(conversation: &Conversation, actor_id: &str, target_id: &str) -> Result<()> {
    authorize(conversation, actor_id, GroupAction::RemoveMember)?;

    match conversation.role_of(target_id) {
        None => Err(HuddleError::not_found("ConversationMember", target_id)),
        Some(MemberRole::Owner) => Err(HuddleError::permission_denied(
            "The group owner cannot be removed",
        )),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::model::ConversationMember;
    use chrono::Utc;

    fn group() -> Conversation {
        let member = |id: &str, role| ConversationMember {
            conversation_id: "c1".to_string(),
            user_id: id.to_string(),
            role,
            joined_at: Utc::now(),
        };
        Conversation {
            id: "c1".to_string(),
            workspace_id: "w1".to_string(),
            is_group: true,
            name: Some("Project X".to_string()),
            created_by: "owner".to_string(),
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
            members: vec![
                member("owner", MemberRole::Owner),
                member("admin", MemberRole::Admin),
                member("m1", MemberRole::Member),
                member("m2", MemberRole::Member),
            ],
        }
    }

    #[test]
    fn test_matrix_matches_table() {
        use GroupAction::*;
        use MemberRole::*;

        let expected = [
            (Rename, [true, false, false]),
            (AddMembers, [true, true, false]),
            (RemoveMember, [true, true, false]),
            (PromoteToAdmin, [true, false, false]),
            (TransferOwnership, [true, false, false]),
            (Delete, [true, false, false]),
            (Leave, [false, true, true]),
        ];

        for (action, allowed) in expected {
            for (role, allow) in [Owner, Admin, Member].into_iter().zip(allowed) {
                assert_eq!(is_allowed(role, action), allow, "{:?} by {:?}", action, role);
            }
        }
    }

    #[test]
    fn test_member_cannot_remove_members() {
        let err = authorize_removal(&group(), "m1", "m2").unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(err.to_string(), "Only group admins can remove members");
    }

    #[test]
    fn test_nobody_removes_the_owner() {
        let err = authorize_removal(&group(), "admin", "owner").unwrap_err();
        assert_eq!(err.to_string(), "The group owner cannot be removed");
        assert!(authorize_removal(&group(), "admin", "m1").is_ok());
    }

    #[test]
    fn test_owner_cannot_leave() {
        let err = authorize(&group(), "owner", GroupAction::Leave).unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(authorize(&group(), "m1", GroupAction::Leave).unwrap(), MemberRole::Member);
    }

    #[test]
    fn test_non_member_is_refused() {
        let err = authorize(&group(), "stranger", GroupAction::AddMembers).unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_direct_conversation_has_no_group_actions() {
        let mut direct = group();
        direct.is_group = false;
        let err = authorize(&direct, "owner", GroupAction::Rename).unwrap_err();
        assert!(err.is_validation());
    }
}
