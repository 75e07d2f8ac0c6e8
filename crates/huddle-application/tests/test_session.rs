mod common;

use common::*;
use huddle_application::{Gateways, WorkspaceSession};
use huddle_core::config::UiSettings;
use huddle_core::error::HuddleError;
use huddle_core::workspace::WorkspaceRole;
use huddle_core::SessionContext;
use huddle_infrastructure::Operation;

#[tokio::test]
async fn test_start_requires_workspace_membership() {
    let backend = seeded_backend().await;

    let outsider = WorkspaceSession::start(
        Gateways::from_backend(backend.clone()),
        OUTSIDER,
        WORKSPACE,
        UiSettings::default(),
    )
    .await;
    assert!(outsider.is_err());

    let unknown = WorkspaceSession::start(
        Gateways::from_backend(backend.clone()),
        "u-nobody",
        WORKSPACE,
        UiSettings::default(),
    )
    .await;
    assert!(unknown.is_err());
}

#[tokio::test]
async fn test_context_reflects_workspace_role() {
    let backend = seeded_backend().await;
    let admin = start_session(&backend, ADMIN).await;
    let bob = start_session(&backend, BOB).await;

    assert!(admin.context().is_workspace_admin());
    assert!(!bob.context().is_workspace_admin());
    assert_eq!(bob.context().user.display_name, "Bob");
    assert_eq!(admin.board().tasks().await.len(), 2);
}

#[tokio::test]
async fn test_board_load_failure_keeps_session_usable() {
    let backend = seeded_backend().await;
    backend.fail_next(Operation::ListTasks);

    let session = start_session(&backend, ADMIN).await;

    assert!(session.board().tasks().await.is_empty());
    assert_eq!(
        session.notifications().last().unwrap().message,
        "Failed to load tasks"
    );

    session.board().load().await.expect("Second load succeeds");
    assert_eq!(session.board().tasks().await.len(), 2);
}

#[tokio::test]
async fn test_switch_workspace_replaces_board() {
    let backend = seeded_backend().await;
    backend
        .seed_workspace_member(OTHER_WORKSPACE, ADMIN, WorkspaceRole::Member)
        .await;
    let session = start_session(&backend, ADMIN).await;
    assert_eq!(session.board().tasks().await.len(), 2);

    let side = SessionContext::new(
        session.context().user.clone(),
        OTHER_WORKSPACE,
        WorkspaceRole::Member,
    );
    session.board().switch_workspace(side).await.unwrap();

    assert_eq!(session.board().workspace_id().await, OTHER_WORKSPACE);
    assert!(session.board().tasks().await.is_empty());

    // Tasks of the previous workspace are gone.
    let err = session.board().begin_drag(LOGIN_TASK).await.unwrap_err();
    assert!(matches!(err, HuddleError::NotFound { .. }));
}
