use super::print_notifications;
use crate::ChatAction;
use anyhow::Result;
use huddle_application::{SendOutcome, WorkspaceSession};

pub async fn run(session: &WorkspaceSession, action: ChatAction) -> Result<()> {
    match action {
        ChatAction::List => list(session).await,
        ChatAction::History { conversation_id } => history(session, &conversation_id).await,
        ChatAction::Send {
            conversation_id,
            text,
        } => send(session, &conversation_id, text).await,
        ChatAction::Direct { user_id } => {
            let result = session.conversations().open_direct(&user_id).await;
            print_notifications(session);
            println!("{}", result?.id);
            Ok(())
        }
    }
}

async fn list(session: &WorkspaceSession) -> Result<()> {
    let result = session.conversations().list().await;
    print_notifications(session);

    let me = session.context().user_id();
    for conversation in result? {
        let title = match (&conversation.name, conversation.counterpart(me)) {
            (Some(name), _) => name.clone(),
            (None, Some(other)) => format!("@{}", other),
            (None, None) => "(empty)".to_string(),
        };
        let last = conversation.last_message.as_deref().unwrap_or("");
        println!("{}  {}  {}", conversation.id, title, last);
    }
    Ok(())
}

async fn history(session: &WorkspaceSession, conversation_id: &str) -> Result<()> {
    let chat = session.open_chat();
    let result = chat.open_conversation(conversation_id).await;
    print_notifications(session);
    result?;

    for entry in chat.entries().await {
        println!(
            "{}  {}: {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.sender.display_name,
            entry.content
        );
    }
    chat.mark_read().await;
    chat.close().await;
    Ok(())
}

async fn send(session: &WorkspaceSession, conversation_id: &str, text: String) -> Result<()> {
    let chat = session.open_chat();
    if let Err(e) = chat.open_conversation(conversation_id).await {
        print_notifications(session);
        return Err(e.into());
    }

    chat.set_input(text).await;
    let result = chat.send().await;
    print_notifications(session);

    match result? {
        SendOutcome::Sent { message_id, .. } => println!("{}", message_id),
        SendOutcome::Skipped => println!("Nothing to send"),
        SendOutcome::Busy => {}
    }
    chat.close().await;
    Ok(())
}
