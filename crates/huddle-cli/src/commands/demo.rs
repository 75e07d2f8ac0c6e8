//! Scripted walk-through against the in-memory backend.

use anyhow::{Context, Result};
use chrono::Utc;
use huddle_application::{Gateways, WorkspaceSession};
use huddle_core::chat::{Conversation, ConversationMember, MemberRole};
use huddle_core::config::UiSettings;
use huddle_core::task::{Task, TaskStatus};
use huddle_core::workspace::{Profile, Workspace, WorkspaceRole};
use huddle_infrastructure::{InMemoryBackend, Operation};
use std::sync::Arc;
use std::time::Duration;

const WORKSPACE: &str = "demo";
const GROUP: &str = "project-x";

async fn seed(backend: &InMemoryBackend) {
    let now = Utc::now();
    backend
        .seed_workspace(Workspace {
            id: WORKSPACE.to_string(),
            name: "Demo workspace".to_string(),
            description: None,
            created_by: "ada".to_string(),
            created_at: now,
        })
        .await;

    for (id, name, role) in [
        ("ada", "Ada", WorkspaceRole::Admin),
        ("ben", "Ben", WorkspaceRole::Member),
        ("cy", "Cy", WorkspaceRole::Member),
    ] {
        backend
            .seed_profile(Profile {
                id: id.to_string(),
                display_name: name.to_string(),
                email: None,
                avatar_url: None,
            })
            .await;
        backend.seed_workspace_member(WORKSPACE, id, role).await;
    }

    backend
        .seed_task(Task {
            id: "login".to_string(),
            workspace_id: WORKSPACE.to_string(),
            title: "Fix login bug".to_string(),
            description: Some("Users are logged out after refresh".to_string()),
            status: TaskStatus::Planning,
            assignee_id: Some("ben".to_string()),
            due_date: None,
            created_by: "ada".to_string(),
            created_at: now,
            updated_at: now,
            attachment_count: 0,
            comment_count: 0,
        })
        .await;

    let member = |user_id: &str, role| ConversationMember {
        conversation_id: GROUP.to_string(),
        user_id: user_id.to_string(),
        role,
        joined_at: now,
    };
    backend
        .seed_conversation(Conversation {
            id: GROUP.to_string(),
            workspace_id: WORKSPACE.to_string(),
            is_group: true,
            name: Some("Project X".to_string()),
            created_by: "ada".to_string(),
            last_message: None,
            last_message_at: None,
            created_at: now,
            members: vec![
                member("ada", MemberRole::Owner),
                member("ben", MemberRole::Member),
                member("cy", MemberRole::Member),
            ],
        })
        .await;
}

fn step(title: &str) {
    println!();
    println!("-- {}", title);
}

fn report(who: &str, session: &WorkspaceSession) {
    if let Some(last) = session.notifications().last() {
        println!("   {} sees: {}", who, last.message);
    }
}

pub async fn run() -> Result<()> {
    let backend = Arc::new(InMemoryBackend::new());
    seed(&backend).await;

    let start = |user: &'static str| {
        let gateways = Gateways::from_backend(backend.clone());
        async move {
            WorkspaceSession::start(gateways, user, WORKSPACE, UiSettings::default())
                .await
                .with_context(|| format!("Failed to start session for {}", user))
        }
    };
    let ada = start("ada").await?;
    let ben = start("ben").await?;
    let cy = start("cy").await?;

    step("Presence");
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("   online for Ada: {:?}", ada.presence().online_user_ids().await);

    step("Admin moves a task");
    ada.board().begin_drag("login").await?;
    ada.board().complete_drag(Some("in_progress")).await?;
    report("Ada", &ada);
    tokio::time::sleep(Duration::from_millis(20)).await;
    if let Some(task) = ben.board().task("login").await {
        println!("   Ben's board shows: {}", task.status);
    }

    step("A move the backend rejects is rolled back");
    backend.fail_next(Operation::UpdateTaskStatus);
    ben.board().begin_drag("login").await?;
    let _ = ben.board().complete_drag(Some("completed")).await;
    report("Ben", &ben);
    if let Some(task) = ben.board().task("login").await {
        println!("   task is back in: {}", task.status);
    }

    step("Members without the task cannot drag it");
    let _ = cy.board().begin_drag("login").await;
    report("Cy", &cy);

    step("Chat with typing indicator");
    let monitor = cy.typing_monitor(GROUP).await?;
    let ada_chat = ada.open_chat();
    let cy_chat = cy.open_chat();
    ada_chat.open_conversation(GROUP).await?;
    cy_chat.open_conversation(GROUP).await?;
    ada.typing_broadcaster().keystroke(GROUP).await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("   Cy sees typing: {:?}", monitor.typing().await);
    ada_chat.set_input("Login fix is in progress").await;
    ada_chat.send().await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    for entry in cy_chat.entries().await {
        println!("   Cy reads: {}: {}", entry.sender.display_name, entry.content);
    }
    monitor.close().await;

    step("Members cannot remove others");
    let _ = cy.conversations().remove_member(GROUP, "ben").await;
    report("Cy", &cy);

    step("Ownership transfer");
    ada.conversations().transfer_ownership(GROUP, "ben").await?;
    report("Ada", &ada);
    if let Some(group) = backend.conversation(GROUP).await {
        for member in &group.members {
            println!("   {}: {:?}", member.user_id, member.role);
        }
    }

    for session in [&ada, &ben, &cy] {
        session.end().await?;
    }
    Ok(())
}
