//! Shared fixture: one workspace with an admin, three members and an
//! outsider, two tasks, a group and a direct conversation.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use huddle_application::{Gateways, WorkspaceSession};
use huddle_core::chat::{Conversation, ConversationMember, MemberRole, Message};
use huddle_core::config::UiSettings;
use huddle_core::task::{Task, TaskStatus};
use huddle_core::workspace::{Profile, Workspace, WorkspaceRole};
use huddle_infrastructure::InMemoryBackend;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const WORKSPACE: &str = "ws-acme";
pub const OTHER_WORKSPACE: &str = "ws-side";

pub const ADMIN: &str = "u-admin";
pub const ALICE: &str = "u-alice";
pub const BOB: &str = "u-bob";
pub const CAROL: &str = "u-carol";
pub const OUTSIDER: &str = "u-outsider";

pub const LOGIN_TASK: &str = "task-login";
pub const NOTES_TASK: &str = "task-notes";

pub const GROUP: &str = "conv-project-x";
pub const DIRECT: &str = "conv-alice-bob";

fn profile(id: &str, name: &str) -> Profile {
    Profile {
        id: id.to_string(),
        display_name: name.to_string(),
        email: Some(format!("{}@acme.test", name.to_lowercase())),
        avatar_url: None,
    }
}

fn task(id: &str, title: &str, status: TaskStatus, assignee: &str) -> Task {
    let now = Utc::now();
    Task {
        id: id.to_string(),
        workspace_id: WORKSPACE.to_string(),
        title: title.to_string(),
        description: None,
        status,
        assignee_id: Some(assignee.to_string()),
        due_date: None,
        created_by: ADMIN.to_string(),
        created_at: now,
        updated_at: now,
        attachment_count: 0,
        comment_count: 0,
    }
}

fn conversation(
    id: &str,
    name: Option<&str>,
    created_by: &str,
    members: &[(&str, MemberRole)],
    age_minutes: i64,
) -> Conversation {
    let created_at = Utc::now() - ChronoDuration::minutes(age_minutes);
    Conversation {
        id: id.to_string(),
        workspace_id: WORKSPACE.to_string(),
        is_group: name.is_some(),
        name: name.map(str::to_string),
        created_by: created_by.to_string(),
        last_message: None,
        last_message_at: None,
        created_at,
        members: members
            .iter()
            .map(|(user_id, role)| ConversationMember {
                conversation_id: id.to_string(),
                user_id: user_id.to_string(),
                role: *role,
                joined_at: created_at,
            })
            .collect(),
    }
}

pub fn message(id: &str, conversation_id: &str, sender_id: &str, content: &str, age_minutes: i64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender_id.to_string(),
        content: content.to_string(),
        created_at: Utc::now() - ChronoDuration::minutes(age_minutes),
        read_by: vec![sender_id.to_string()],
    }
}

/// Backend seeded with the shared fixture.
pub async fn seeded_backend() -> Arc<InMemoryBackend> {
    let backend = InMemoryBackend::new();

    for (id, name) in [(WORKSPACE, "Acme"), (OTHER_WORKSPACE, "Side project")] {
        backend
            .seed_workspace(Workspace {
                id: id.to_string(),
                name: name.to_string(),
                description: None,
                created_by: ADMIN.to_string(),
                created_at: Utc::now(),
            })
            .await;
    }

    for (id, name) in [
        (ADMIN, "Admin"),
        (ALICE, "Alice"),
        (BOB, "Bob"),
        (CAROL, "Carol"),
        (OUTSIDER, "Olivia"),
    ] {
        backend.seed_profile(profile(id, name)).await;
    }

    backend.seed_workspace_member(WORKSPACE, ADMIN, WorkspaceRole::Admin).await;
    for member in [ALICE, BOB, CAROL] {
        backend.seed_workspace_member(WORKSPACE, member, WorkspaceRole::Member).await;
    }
    backend.seed_workspace_member(OTHER_WORKSPACE, OUTSIDER, WorkspaceRole::Admin).await;

    backend
        .seed_task(task(LOGIN_TASK, "Fix login bug", TaskStatus::Planning, ALICE))
        .await;
    backend
        .seed_task(task(NOTES_TASK, "Write release notes", TaskStatus::InProgress, BOB))
        .await;

    backend
        .seed_conversation(conversation(
            GROUP,
            Some("Project X"),
            ALICE,
            &[
                (ALICE, MemberRole::Owner),
                (BOB, MemberRole::Member),
                (CAROL, MemberRole::Member),
                (ADMIN, MemberRole::Member),
            ],
            60,
        ))
        .await;
    backend
        .seed_conversation(conversation(
            DIRECT,
            None,
            ALICE,
            &[(ALICE, MemberRole::Member), (BOB, MemberRole::Member)],
            30,
        ))
        .await;

    Arc::new(backend)
}

/// Starts a workspace session for `user_id` in the fixture workspace.
pub async fn start_session(backend: &Arc<InMemoryBackend>, user_id: &str) -> WorkspaceSession {
    WorkspaceSession::start(
        Gateways::from_backend(backend.clone()),
        user_id,
        WORKSPACE,
        UiSettings::default(),
    )
    .await
    .expect("Should start workspace session")
}

/// Polls `check` until it holds, letting spawned listeners run in between.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
