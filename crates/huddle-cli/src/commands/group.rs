use super::print_notifications;
use crate::GroupAction;
use anyhow::Result;
use huddle_application::WorkspaceSession;

pub async fn run(session: &WorkspaceSession, action: GroupAction) -> Result<()> {
    let service = session.conversations();
    let result = match action {
        GroupAction::Create { name, members } => service
            .create_group(&name, &members)
            .await
            .map(|group| println!("{}", group.id)),
        GroupAction::Rename {
            conversation_id,
            name,
        } => service.rename(&conversation_id, &name).await,
        GroupAction::Add {
            conversation_id,
            user_ids,
        } => service.add_members(&conversation_id, &user_ids).await,
        GroupAction::Remove {
            conversation_id,
            user_id,
        } => service.remove_member(&conversation_id, &user_id).await,
        GroupAction::Promote {
            conversation_id,
            user_id,
        } => service.promote_to_admin(&conversation_id, &user_id).await,
        GroupAction::Transfer {
            conversation_id,
            user_id,
        } => service.transfer_ownership(&conversation_id, &user_id).await,
        GroupAction::Delete { conversation_id } => service.delete_group(&conversation_id).await,
        GroupAction::Leave { conversation_id } => service.leave(&conversation_id).await,
    };
    print_notifications(session);
    Ok(result?)
}
