use super::print_notifications;
use anyhow::{Result, bail};
use huddle_application::{DragOutcome, WorkspaceSession};
use huddle_core::task::{NewTask, TaskStatus};

pub async fn show(session: &WorkspaceSession, search: Option<String>) -> Result<()> {
    let board = session.board();
    if let Some(query) = search {
        board.set_search(query).await;
    }

    for column in board.columns().await {
        println!("== {} ({})", column.label, column.tasks.len());
        for task in &column.tasks {
            let assignee = task.assignee_id.as_deref().unwrap_or("unassigned");
            let due = task
                .due_date
                .map(|d| format!(" due {}", d))
                .unwrap_or_default();
            println!(
                "   {}  {}  [{}]{}  comments:{}",
                task.id, task.title, assignee, due, task.comment_count
            );
        }
    }
    print_notifications(session);
    Ok(())
}

pub async fn move_task(session: &WorkspaceSession, task_id: &str, column: &str) -> Result<()> {
    if TaskStatus::from_column_id(column).is_none() {
        let statuses = TaskStatus::all();
        let columns: Vec<&str> = statuses.iter().map(|s| s.column_id()).collect();
        bail!("Unknown column '{}', expected one of: {}", column, columns.join(", "));
    }

    let board = session.board();
    let result = async {
        board.begin_drag(task_id).await?;
        board.complete_drag(Some(column)).await
    }
    .await;
    print_notifications(session);

    match result? {
        DragOutcome::Unchanged => println!("{} is already in {}", task_id, column),
        DragOutcome::Moved { .. } | DragOutcome::Ignored | DragOutcome::Discarded => {}
    }
    Ok(())
}

pub async fn create(
    session: &WorkspaceSession,
    title: String,
    description: Option<String>,
    assignee: Option<String>,
) -> Result<()> {
    let ctx = session.context();
    let form = NewTask {
        workspace_id: ctx.workspace_id.clone(),
        title,
        description,
        status: TaskStatus::Planning,
        assignee_id: assignee,
        due_date: None,
        created_by: ctx.user_id().to_string(),
    };

    let result = session.board().create_task(form).await;
    print_notifications(session);
    let task = result?;
    println!("{}", task.id);
    Ok(())
}
