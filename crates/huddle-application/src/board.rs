//! Task board presenter.
//!
//! Owns the in-memory task list of one workspace and turns drag gestures
//! into status changes. Every change is applied locally first and then
//! persisted; a failed request restores exactly the value the change
//! replaced.
//!
//! # Racing moves
//!
//! Each optimistic move of a task takes a sequence number. When the request
//! of a move settles, its result is applied only if that move is still the
//! latest one for the task, so an older result never overwrites a newer
//! optimistic status. The last status the store confirmed is tracked while
//! moves are in flight; a failed latest move falls back to it rather than
//! to an optimistic status of an earlier move.
//!
//! # Cancellation
//!
//! `unmount` and `switch_workspace` cancel the current board epoch. Requests
//! already in flight still complete, but their results are discarded.

use chrono::Utc;
use huddle_core::error::{HuddleError, Result};
use huddle_core::notification::{AssignmentMailer, Notification, Notifier};
use huddle_core::realtime::{ChangeEvent, RealtimeGateway};
use huddle_core::task::{
    BoardColumn, NewTask, Task, TaskAssignment, TaskComment, TaskRepository, TaskStatus,
    build_columns,
};
use huddle_core::workspace::{ProfileRepository, WorkspaceRepository};
use huddle_core::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The task currently being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub task_id: String,
    pub from_status: TaskStatus,
}

/// What a drop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// No drag was active, or the drop was outside any column.
    Ignored,
    /// Dropped on the column the task is already in.
    Unchanged,
    /// The move was persisted.
    Moved { from: TaskStatus, to: TaskStatus },
    /// The board was unmounted or switched while the request was in flight.
    Discarded,
}

/// Moves of one task whose requests have not settled yet.
struct MovesInFlight {
    latest: u64,
    /// Status the store last confirmed for the task.
    persisted: TaskStatus,
}

struct BoardState {
    ctx: SessionContext,
    tasks: Vec<Task>,
    search: String,
    drag: Option<DragPayload>,
    moves: HashMap<String, MovesInFlight>,
    next_move: u64,
    epoch: CancellationToken,
}

impl BoardState {
    fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            tasks: Vec::new(),
            search: String::new(),
            drag: None,
            moves: HashMap::new(),
            next_move: 0,
            epoch: CancellationToken::new(),
        }
    }

    fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Admins edit anything; members edit what is assigned to them.
    fn authorize_edit(&self, task: &Task, denied: &str) -> Result<()> {
        if self.ctx.is_workspace_admin() || task.is_assigned_to(self.ctx.user_id()) {
            Ok(())
        } else {
            Err(HuddleError::permission_denied(denied))
        }
    }

    /// Registers a move away from `from`, the status shown before the drop.
    fn begin_move(&mut self, task_id: &str, from: TaskStatus) -> u64 {
        self.next_move += 1;
        let seq = self.next_move;
        self.moves
            .entry(task_id.to_string())
            .and_modify(|moves| moves.latest = seq)
            .or_insert(MovesInFlight {
                latest: seq,
                persisted: from,
            });
        seq
    }

    /// Settles move `seq`.
    ///
    /// Returns the status a failed move should restore, or `None` when a
    /// newer move of the task is still in flight.
    fn settle_move(&mut self, task_id: &str, seq: u64, stored: Option<TaskStatus>) -> Option<TaskStatus> {
        let moves = self.moves.get_mut(task_id)?;
        if let Some(status) = stored {
            moves.persisted = status;
        }
        if moves.latest != seq {
            return None;
        }
        self.moves.remove(task_id).map(|moves| moves.persisted)
    }
}

/// Presenter for the workspace task board.
#[derive(Clone)]
pub struct BoardPresenter {
    state: Arc<RwLock<BoardState>>,
    tasks: Arc<dyn TaskRepository>,
    workspaces: Arc<dyn WorkspaceRepository>,
    profiles: Arc<dyn ProfileRepository>,
    notifier: Arc<dyn Notifier>,
    mailer: Option<Arc<dyn AssignmentMailer>>,
}

impl BoardPresenter {
    pub fn new(
        ctx: SessionContext,
        tasks: Arc<dyn TaskRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        profiles: Arc<dyn ProfileRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(BoardState::new(ctx))),
            tasks,
            workspaces,
            profiles,
            notifier,
            mailer: None,
        }
    }

    /// Sends assignment notices through `mailer` when tasks are created.
    pub fn with_mailer(mut self, mailer: Arc<dyn AssignmentMailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    fn fail<T>(&self, err: HuddleError, generic: &str) -> Result<T> {
        self.notifier
            .notify(Notification::error(err.user_message(generic)));
        Err(err)
    }

    // ------------------------------------------------------------------
    // Task store
    // ------------------------------------------------------------------

    /// Fetches the workspace tasks, replacing the local list.
    pub async fn load(&self) -> Result<()> {
        let (workspace_id, epoch) = {
            let state = self.state.read().await;
            (state.ctx.workspace_id.clone(), state.epoch.clone())
        };

        let fetched = match self.tasks.list_by_workspace(&workspace_id).await {
            Ok(tasks) => tasks,
            Err(e) => return self.fail(e, "Failed to load tasks"),
        };

        let mut state = self.state.write().await;
        if epoch.is_cancelled() {
            tracing::warn!(
                "[BoardPresenter] Discarding task list of stale workspace {}",
                workspace_id
            );
            return Ok(());
        }
        tracing::debug!(
            "[BoardPresenter] Loaded {} tasks for workspace {}",
            fetched.len(),
            workspace_id
        );
        state.tasks = fetched;
        Ok(())
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    pub async fn task(&self, task_id: &str) -> Option<Task> {
        self.state.read().await.task(task_id).cloned()
    }

    pub async fn workspace_id(&self) -> String {
        self.state.read().await.ctx.workspace_id.clone()
    }

    /// Sets the board search query. An empty query shows everything.
    pub async fn set_search(&self, query: impl Into<String>) {
        self.state.write().await.search = query.into();
    }

    /// Tasks grouped into the six status columns under the active search.
    pub async fn columns(&self) -> Vec<BoardColumn> {
        let state = self.state.read().await;
        let query = Some(state.search.as_str()).filter(|q| !q.trim().is_empty());
        build_columns(&state.tasks, query)
    }

    /// Applies a task row change observed on the realtime channel.
    ///
    /// Last write wins, except that a task with a move in flight keeps its
    /// optimistic status until the move settles.
    pub async fn apply_change(&self, event: ChangeEvent<Task>) {
        let mut state = self.state.write().await;
        match event {
            ChangeEvent::Inserted { record } | ChangeEvent::Updated { record } => {
                if record.workspace_id != state.ctx.workspace_id {
                    return;
                }
                let in_flight = state.moves.contains_key(&record.id);
                if let Some(moves) = state.moves.get_mut(&record.id) {
                    moves.persisted = record.status;
                }
                match state.task_mut(&record.id) {
                    Some(existing) => {
                        let status = existing.status;
                        *existing = record;
                        if in_flight {
                            existing.status = status;
                        }
                    }
                    None => state.tasks.insert(0, record),
                }
            }
            ChangeEvent::Deleted { id } => {
                state.tasks.retain(|t| t.id != id);
                if state.drag.as_ref().is_some_and(|d| d.task_id == id) {
                    state.drag = None;
                }
            }
        }
    }

    /// Subscribes to task changes of the current workspace and applies them
    /// until the board epoch is cancelled.
    pub async fn attach_realtime(&self, realtime: &dyn RealtimeGateway) -> Result<JoinHandle<()>> {
        let (workspace_id, epoch) = {
            let state = self.state.read().await;
            (state.ctx.workspace_id.clone(), state.epoch.clone())
        };
        let mut subscription = realtime.subscribe_tasks(&workspace_id).await?;
        let board = self.clone();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = epoch.cancelled() => break,
                    event = subscription.recv() => match event {
                        Some(event) => board.apply_change(event).await,
                        None => break,
                    },
                }
            }
            tracing::debug!("[BoardPresenter] Task listener for {} stopped", workspace_id);
        }))
    }

    // ------------------------------------------------------------------
    // Drag and drop
    // ------------------------------------------------------------------

    /// Starts dragging `task_id`.
    ///
    /// Refused with a notification unless the user is a workspace admin or
    /// the task's assignee.
    pub async fn begin_drag(&self, task_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(task) = state.task(task_id).cloned() else {
            drop(state);
            return self.fail(HuddleError::not_found("Task", task_id), "Failed to move task");
        };

        if let Err(e) = state.authorize_edit(&task, "You don't have permission to move this task") {
            drop(state);
            tracing::debug!("[BoardPresenter] Drag of {} refused", task_id);
            return self.fail(e, "Failed to move task");
        }

        state.drag = Some(DragPayload {
            task_id: task.id,
            from_status: task.status,
        });
        Ok(())
    }

    pub async fn drag_payload(&self) -> Option<DragPayload> {
        self.state.read().await.drag.clone()
    }

    pub async fn cancel_drag(&self) {
        self.state.write().await.drag = None;
    }

    /// Drops the dragged task on `column_id`; `None` is a drop outside any
    /// column.
    pub async fn complete_drag(&self, column_id: Option<&str>) -> Result<DragOutcome> {
        let (task_id, from, to, seq, epoch) = {
            let mut state = self.state.write().await;
            let Some(payload) = state.drag.take() else {
                return Ok(DragOutcome::Ignored);
            };
            let Some(to) = column_id.and_then(TaskStatus::from_column_id) else {
                tracing::debug!("[BoardPresenter] Drop outside any column: {:?}", column_id);
                return Ok(DragOutcome::Ignored);
            };
            let Some(task) = state.task_mut(&payload.task_id) else {
                drop(state);
                return self.fail(
                    HuddleError::not_found("Task", payload.task_id),
                    "Failed to move task",
                );
            };

            let from = task.status;
            if from == to {
                return Ok(DragOutcome::Unchanged);
            }
            task.status = to;
            let seq = state.begin_move(&payload.task_id, from);
            (payload.task_id, from, to, seq, state.epoch.clone())
        };

        tracing::debug!(
            "[BoardPresenter] Moving {} {} -> {} (move {})",
            task_id,
            from.column_id(),
            to.column_id(),
            seq
        );
        let result = self.tasks.update_status(&task_id, to).await;

        let mut state = self.state.write().await;
        if epoch.is_cancelled() {
            tracing::warn!(
                "[BoardPresenter] Discarding result of move {} for {}",
                seq,
                task_id
            );
            return Ok(DragOutcome::Discarded);
        }
        let stored = result.as_ref().ok().map(|task| task.status);
        let restore = state.settle_move(&task_id, seq, stored);

        match result {
            Ok(persisted) => {
                if restore.is_some() && let Some(task) = state.task_mut(&task_id) {
                    task.status = persisted.status;
                    task.updated_at = persisted.updated_at;
                }
                drop(state);
                tracing::info!("[BoardPresenter] Task {} moved to {}", task_id, to.column_id());
                self.notifier.notify(Notification::success(format!(
                    "Task moved from {} to {}",
                    from.label(),
                    to.label()
                )));
                Ok(DragOutcome::Moved { from, to })
            }
            Err(e) => {
                if let Some(status) = restore
                    && let Some(task) = state.task_mut(&task_id)
                {
                    task.status = status;
                    tracing::warn!(
                        "[BoardPresenter] Move of {} failed, rolled back to {}: {}",
                        task_id,
                        status.column_id(),
                        e
                    );
                } else {
                    tracing::warn!("[BoardPresenter] Superseded move {} of {} failed: {}", seq, task_id, e);
                }
                drop(state);
                self.fail(e, "Failed to update task status")
            }
        }
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Creates a task in the current workspace.
    ///
    /// When the task is assigned to someone other than the creator, an
    /// assignment notice is sent in the background.
    pub async fn create_task(&self, mut form: NewTask) -> Result<Task> {
        let ctx = self.state.read().await.ctx.clone();
        form.workspace_id = ctx.workspace_id.clone();
        form.created_by = ctx.user_id().to_string();
        let form = form.normalized();

        if let Err(e) = form.validate() {
            return self.fail(e, "Failed to create task");
        }

        if let Some(assignee) = form.assignee_id.as_deref() {
            match self.workspaces.is_member(&ctx.workspace_id, assignee).await {
                Ok(true) => {}
                Ok(false) => {
                    return self.fail(
                        HuddleError::validation("Assignee must be a member of this workspace"),
                        "Failed to create task",
                    );
                }
                Err(e) => return self.fail(e, "Failed to create task"),
            }
        }

        let created = match self.tasks.insert(&form).await {
            Ok(task) => task,
            Err(e) => return self.fail(e, "Failed to create task"),
        };

        {
            let mut state = self.state.write().await;
            if state.ctx.workspace_id == created.workspace_id && state.task(&created.id).is_none() {
                state.tasks.insert(0, created.clone());
            }
        }
        tracing::info!("[BoardPresenter] Created task {}", created.id);
        self.notifier.notify(Notification::success("Task created"));

        if let Some(assignee) = created.assignee_id.as_deref()
            && assignee != ctx.user_id()
        {
            self.notify_assignee(&ctx, &created, assignee).await;
        }

        Ok(created)
    }

    async fn notify_assignee(&self, ctx: &SessionContext, task: &Task, assignee_id: &str) {
        let Some(mailer) = self.mailer.clone() else {
            return;
        };
        let profile = match self.profiles.find_by_id(assignee_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("[BoardPresenter] Could not resolve assignee {}: {}", assignee_id, e);
                return;
            }
        };
        let Some(email) = profile.email.clone() else {
            tracing::debug!("[BoardPresenter] Assignee {} has no email", assignee_id);
            return;
        };

        let assignment = TaskAssignment {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            workspace_id: task.workspace_id.clone(),
            assignee_email: email,
            assignee_name: profile.display_name,
            assigned_by: ctx.user.display_name.clone(),
            due_date: task.due_date,
        };
        tokio::spawn(async move {
            if let Err(e) = mailer.send_assignment(&assignment).await {
                tracing::warn!(
                    "[BoardPresenter] Assignment notice for {} not delivered: {}",
                    assignment.task_id,
                    e
                );
            }
        });
    }

    /// Edits a task description. `None` or blank clears it.
    pub async fn update_description(&self, task_id: &str, description: Option<String>) -> Result<Task> {
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let (previous, epoch) = {
            let mut state = self.state.write().await;
            let Some(task) = state.task(task_id).cloned() else {
                drop(state);
                return self.fail(HuddleError::not_found("Task", task_id), "Failed to update task");
            };
            if let Err(e) = state.authorize_edit(&task, "You don't have permission to edit this task") {
                drop(state);
                return self.fail(e, "Failed to update task");
            }
            if let Some(task) = state.task_mut(task_id) {
                task.description = description.clone();
            }
            (task.description, state.epoch.clone())
        };

        let result = self
            .tasks
            .update_description(task_id, description.as_deref())
            .await;

        let mut state = self.state.write().await;
        if epoch.is_cancelled() {
            return result;
        }
        match result {
            Ok(persisted) => {
                if let Some(task) = state.task_mut(task_id) {
                    task.description = persisted.description.clone();
                    task.updated_at = persisted.updated_at;
                }
                drop(state);
                self.notifier.notify(Notification::success("Task updated"));
                Ok(persisted)
            }
            Err(e) => {
                // Only undo our own edit; a newer one stays.
                if let Some(task) = state.task_mut(task_id)
                    && task.description == description
                {
                    task.description = previous;
                }
                drop(state);
                self.fail(e, "Failed to update task")
            }
        }
    }

    /// Adds a comment to a task and bumps its comment count.
    pub async fn add_comment(&self, task_id: &str, content: &str) -> Result<TaskComment> {
        let content = content.trim();
        if content.is_empty() {
            return self.fail(
                HuddleError::validation("Comment cannot be empty"),
                "Failed to add comment",
            );
        }

        let user_id = {
            let state = self.state.read().await;
            if state.task(task_id).is_none() {
                drop(state);
                return self.fail(HuddleError::not_found("Task", task_id), "Failed to add comment");
            }
            state.ctx.user_id().to_string()
        };

        let comment = match self.tasks.add_comment(task_id, &user_id, content).await {
            Ok(comment) => comment,
            Err(e) => return self.fail(e, "Failed to add comment"),
        };

        if let Some(task) = self.state.write().await.task_mut(task_id) {
            task.comment_count += 1;
            task.updated_at = Utc::now();
        }
        Ok(comment)
    }

    pub async fn comments(&self, task_id: &str) -> Result<Vec<TaskComment>> {
        match self.tasks.list_comments(task_id).await {
            Ok(comments) => Ok(comments),
            Err(e) => self.fail(e, "Failed to load comments"),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Stops the realtime listener and discards results still in flight.
    pub async fn unmount(&self) {
        let mut state = self.state.write().await;
        state.epoch.cancel();
        state.drag = None;
        state.moves.clear();
        tracing::debug!("[BoardPresenter] Unmounted board of {}", state.ctx.workspace_id);
    }

    /// Rebinds the board to another workspace and loads its tasks.
    ///
    /// Call `attach_realtime` again afterwards; the old listener stops.
    pub async fn switch_workspace(&self, ctx: SessionContext) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.epoch.cancel();
            tracing::info!(
                "[BoardPresenter] Switching board {} -> {}",
                state.ctx.workspace_id,
                ctx.workspace_id
            );
            *state = BoardState::new(ctx);
        }
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationCenter;
    use async_trait::async_trait;
    use huddle_core::workspace::{Profile, Workspace, WorkspaceMember, WorkspaceRole};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Task repository double keeping rows in a map.
    #[derive(Default)]
    struct MockTaskRepository {
        tasks: Mutex<HashMap<String, Task>>,
        fail_updates: Mutex<bool>,
        /// Return updated rows without their derived counts.
        bare_rows: Mutex<bool>,
    }

    impl MockTaskRepository {
        fn with(tasks: Vec<Task>) -> Self {
            let repo = Self::default();
            {
                let mut map = repo.tasks.lock().unwrap();
                for task in tasks {
                    map.insert(task.id.clone(), task);
                }
            }
            repo
        }
    }

    #[async_trait]
    impl TaskRepository for MockTaskRepository {
        async fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>> {
            Ok(self
                .tasks
                .lock()
                .unwrap()
                .values()
                .filter(|t| t.workspace_id == workspace_id)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
            Ok(self.tasks.lock().unwrap().get(task_id).cloned())
        }

        async fn insert(&self, task: &NewTask) -> Result<Task> {
            let created = Task {
                id: format!("t{}", self.tasks.lock().unwrap().len() + 1),
                workspace_id: task.workspace_id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
                status: task.status,
                assignee_id: task.assignee_id.clone(),
                due_date: task.due_date,
                created_by: task.created_by.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                attachment_count: 0,
                comment_count: 0,
            };
            self.tasks
                .lock()
                .unwrap()
                .insert(created.id.clone(), created.clone());
            Ok(created)
        }

        async fn update_status(&self, task_id: &str, status: TaskStatus) -> Result<Task> {
            if *self.fail_updates.lock().unwrap() {
                return Err(HuddleError::data_access("network down"));
            }
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks
                .get_mut(task_id)
                .ok_or_else(|| HuddleError::not_found("Task", task_id))?;
            task.status = status;
            task.updated_at = Utc::now();
            let mut row = task.clone();
            if *self.bare_rows.lock().unwrap() {
                row.attachment_count = 0;
                row.comment_count = 0;
            }
            Ok(row)
        }

        async fn update_description(&self, task_id: &str, description: Option<&str>) -> Result<Task> {
            if *self.fail_updates.lock().unwrap() {
                return Err(HuddleError::data_access("network down"));
            }
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks
                .get_mut(task_id)
                .ok_or_else(|| HuddleError::not_found("Task", task_id))?;
            task.description = description.map(str::to_string);
            Ok(task.clone())
        }

        async fn add_comment(&self, task_id: &str, user_id: &str, content: &str) -> Result<TaskComment> {
            Ok(TaskComment {
                id: "c1".to_string(),
                task_id: task_id.to_string(),
                user_id: user_id.to_string(),
                content: content.to_string(),
                created_at: Utc::now(),
            })
        }

        async fn list_comments(&self, _task_id: &str) -> Result<Vec<TaskComment>> {
            Ok(Vec::new())
        }
    }

    struct MockWorkspaces {
        members: Vec<&'static str>,
    }

    #[async_trait]
    impl WorkspaceRepository for MockWorkspaces {
        async fn find_by_id(&self, _workspace_id: &str) -> Result<Option<Workspace>> {
            Ok(None)
        }

        async fn list_for_user(&self, _user_id: &str) -> Result<Vec<Workspace>> {
            Ok(Vec::new())
        }

        async fn find_member(&self, workspace_id: &str, user_id: &str) -> Result<Option<WorkspaceMember>> {
            let known = self.members.iter().any(|m| *m == user_id);
            Ok(known.then(|| WorkspaceMember {
                workspace_id: workspace_id.to_string(),
                user_id: user_id.to_string(),
                role: WorkspaceRole::Member,
                joined_at: Utc::now(),
            }))
        }

        async fn list_members(&self, _workspace_id: &str) -> Result<Vec<WorkspaceMember>> {
            Ok(Vec::new())
        }
    }

    struct NoProfiles;

    #[async_trait]
    impl ProfileRepository for NoProfiles {
        async fn find_by_id(&self, _user_id: &str) -> Result<Option<Profile>> {
            Ok(None)
        }

        async fn find_many(&self, _user_ids: &[String]) -> Result<Vec<Profile>> {
            Ok(Vec::new())
        }
    }

    fn task(id: &str, title: &str, status: TaskStatus, assignee: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            workspace_id: "w1".to_string(),
            title: title.to_string(),
            description: None,
            status,
            assignee_id: assignee.map(str::to_string),
            due_date: None,
            created_by: "admin".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            attachment_count: 0,
            comment_count: 0,
        }
    }

    fn ctx(user_id: &str, role: WorkspaceRole) -> SessionContext {
        SessionContext::new(Profile::unknown(user_id), "w1", role)
    }

    async fn presenter(
        ctx: SessionContext,
        repo: Arc<MockTaskRepository>,
    ) -> (BoardPresenter, NotificationCenter) {
        let center = NotificationCenter::new(Duration::from_millis(4000));
        let board = BoardPresenter::new(
            ctx,
            repo,
            Arc::new(MockWorkspaces {
                members: vec!["admin", "bob"],
            }),
            Arc::new(NoProfiles),
            Arc::new(center.clone()),
        );
        board.load().await.unwrap();
        (board, center)
    }

    #[tokio::test]
    async fn test_admin_move_succeeds_with_column_labels() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Fix login bug",
            TaskStatus::Planning,
            None,
        )]));
        let (board, center) = presenter(ctx("admin", WorkspaceRole::Admin), repo.clone()).await;

        board.begin_drag("t1").await.unwrap();
        let outcome = board.complete_drag(Some("in_progress")).await.unwrap();

        assert_eq!(
            outcome,
            DragOutcome::Moved {
                from: TaskStatus::Planning,
                to: TaskStatus::InProgress
            }
        );
        assert_eq!(board.task("t1").await.unwrap().status, TaskStatus::InProgress);
        assert_eq!(
            center.last().unwrap().message,
            "Task moved from Planning to In Progress"
        );
    }

    #[tokio::test]
    async fn test_failed_move_restores_prior_status() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Fix login bug",
            TaskStatus::Planning,
            None,
        )]));
        *repo.fail_updates.lock().unwrap() = true;
        let (board, center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        board.begin_drag("t1").await.unwrap();
        assert!(board.complete_drag(Some("in_progress")).await.is_err());

        assert_eq!(board.task("t1").await.unwrap().status, TaskStatus::Planning);
        assert_eq!(center.last().unwrap().message, "Failed to update task status");
    }

    #[tokio::test]
    async fn test_assignee_may_drag_but_others_may_not() {
        let repo = Arc::new(MockTaskRepository::with(vec![
            task("t1", "Mine", TaskStatus::Planning, Some("bob")),
            task("t2", "Theirs", TaskStatus::Planning, Some("carol")),
        ]));
        let (board, center) = presenter(ctx("bob", WorkspaceRole::Member), repo).await;

        assert!(board.begin_drag("t1").await.is_ok());
        board.cancel_drag().await;

        let err = board.begin_drag("t2").await.unwrap_err();
        assert!(err.is_permission_denied());
        assert!(board.drag_payload().await.is_none());
        assert_eq!(
            center.last().unwrap().message,
            "You don't have permission to move this task"
        );
    }

    #[tokio::test]
    async fn test_invalid_column_and_same_column_are_no_ops() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Fix login bug",
            TaskStatus::Planning,
            None,
        )]));
        let (board, _center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        board.begin_drag("t1").await.unwrap();
        assert_eq!(board.complete_drag(Some("archived")).await.unwrap(), DragOutcome::Ignored);

        board.begin_drag("t1").await.unwrap();
        assert_eq!(board.complete_drag(None).await.unwrap(), DragOutcome::Ignored);

        board.begin_drag("t1").await.unwrap();
        assert_eq!(board.complete_drag(Some("planning")).await.unwrap(), DragOutcome::Unchanged);

        assert_eq!(board.task("t1").await.unwrap().status, TaskStatus::Planning);
    }

    #[tokio::test]
    async fn test_columns_apply_search() {
        let repo = Arc::new(MockTaskRepository::with(vec![
            task("t1", "Fix login bug", TaskStatus::Planning, None),
            task("t2", "Write docs", TaskStatus::Planning, None),
        ]));
        let (board, _center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        board.set_search("LOGIN").await;
        let columns = board.columns().await;
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[0].tasks.len(), 1);
        assert_eq!(columns[0].tasks[0].id, "t1");
    }

    #[tokio::test]
    async fn test_realtime_update_keeps_in_flight_status() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Fix login bug",
            TaskStatus::Planning,
            None,
        )]));
        let (board, _center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;
        {
            let mut state = board.state.write().await;
            state.task_mut("t1").unwrap().status = TaskStatus::Completed;
            state.begin_move("t1", TaskStatus::Planning);
        }

        let mut remote = task("t1", "Fix login bug (renamed)", TaskStatus::OnHold, None);
        remote.comment_count = 3;
        board.apply_change(ChangeEvent::Updated { record: remote }).await;

        let local = board.task("t1").await.unwrap();
        assert_eq!(local.status, TaskStatus::Completed);
        assert_eq!(local.title, "Fix login bug (renamed)");
        assert_eq!(local.comment_count, 3);
    }

    #[tokio::test]
    async fn test_create_task_rejects_blank_title_and_outsider_assignee() {
        let repo = Arc::new(MockTaskRepository::default());
        let (board, center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        let form = NewTask {
            workspace_id: String::new(),
            title: "   ".to_string(),
            description: None,
            status: TaskStatus::Planning,
            assignee_id: None,
            due_date: None,
            created_by: String::new(),
        };
        assert!(board.create_task(form.clone()).await.unwrap_err().is_validation());
        assert_eq!(center.last().unwrap().message, "Task title is required");

        let outsider = NewTask {
            title: "Ship".to_string(),
            assignee_id: Some("mallory".to_string()),
            ..form.clone()
        };
        assert!(board.create_task(outsider).await.unwrap_err().is_validation());

        let ok = NewTask {
            title: " Ship ".to_string(),
            assignee_id: Some("bob".to_string()),
            ..form
        };
        let created = board.create_task(ok).await.unwrap();
        assert_eq!(created.title, "Ship");
        assert_eq!(created.workspace_id, "w1");
        assert_eq!(created.created_by, "admin");
        assert_eq!(board.tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_description_edit_rolls_back() {
        let mut original = task("t1", "Fix login bug", TaskStatus::Planning, None);
        original.description = Some("old".to_string());
        let repo = Arc::new(MockTaskRepository::with(vec![original]));
        *repo.fail_updates.lock().unwrap() = true;
        let (board, _center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        assert!(board
            .update_description("t1", Some("new".to_string()))
            .await
            .is_err());
        assert_eq!(board.task("t1").await.unwrap().description.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Fix login bug",
            TaskStatus::Planning,
            None,
        )]));
        let (board, center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        assert!(board.add_comment("t1", "  ").await.unwrap_err().is_validation());
        assert_eq!(center.last().unwrap().message, "Comment cannot be empty");

        board.add_comment("t1", "Looks good").await.unwrap();
        assert_eq!(board.task("t1").await.unwrap().comment_count, 1);
    }

    #[tokio::test]
    async fn test_unmount_discards_in_flight_move() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Fix login bug",
            TaskStatus::Planning,
            None,
        )]));
        let (board, _center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;
        board.begin_drag("t1").await.unwrap();
        board.unmount().await;

        // The drag payload is gone once the board is unmounted.
        assert_eq!(board.complete_drag(Some("completed")).await.unwrap(), DragOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_move_keeps_derived_counts() {
        let mut original = task("t1", "Fix login bug", TaskStatus::Planning, None);
        original.comment_count = 3;
        original.attachment_count = 2;
        let repo = Arc::new(MockTaskRepository::with(vec![original]));
        *repo.bare_rows.lock().unwrap() = true;
        let (board, _center) = presenter(ctx("admin", WorkspaceRole::Admin), repo).await;

        board.begin_drag("t1").await.unwrap();
        board.complete_drag(Some("in_progress")).await.unwrap();

        let moved = board.task("t1").await.unwrap();
        assert_eq!(moved.status, TaskStatus::InProgress);
        assert_eq!(moved.comment_count, 3);
        assert_eq!(moved.attachment_count, 2);
    }

    #[tokio::test]
    async fn test_description_edit_denial_names_the_edit() {
        let repo = Arc::new(MockTaskRepository::with(vec![task(
            "t1",
            "Theirs",
            TaskStatus::Planning,
            Some("carol"),
        )]));
        let (board, center) = presenter(ctx("bob", WorkspaceRole::Member), repo).await;

        let err = board
            .update_description("t1", Some("new".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(
            center.last().unwrap().message,
            "You don't have permission to edit this task"
        );
        assert!(board.task("t1").await.unwrap().description.is_none());
    }
}
