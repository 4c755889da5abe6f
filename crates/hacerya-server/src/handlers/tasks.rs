use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use hacerya_shared::{
    api::{CreateTaskRequest, UpdateTaskRequest, UpdateTaskStatusRequest},
    Priority, Task, TaskStatus, TaskWithAssignee,
};
use uuid::Uuid;

use crate::access::{resolve_access, resolve_task_access, Capability, EntityKind, TaskAccess};
use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

type TaskRow = (
    Uuid,                          // id
    Uuid,                          // project_id
    String,                        // title
    Option<String>,                // description
    TaskStatus,                    // status
    Priority,                      // priority
    Option<NaiveDate>,             // due_date
    Option<Uuid>,                  // assigned_to
    chrono::DateTime<Utc>,         // created_at
    chrono::DateTime<Utc>,         // updated_at
    Option<chrono::DateTime<Utc>>, // completed_at
);

fn row_to_task(row: TaskRow) -> Task {
    Task {
        id: row.0,
        project_id: row.1,
        title: row.2,
        description: row.3,
        status: row.4,
        priority: row.5,
        due_date: row.6,
        assigned_to: row.7,
        created_at: row.8,
        updated_at: row.9,
        completed_at: row.10,
    }
}

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, due_date, \
                            assigned_to, created_at, updated_at, completed_at";

/// Resolves the task chain and hides both "missing" and "no access" behind
/// the same not-found answer. Also rejects tasks reached through the wrong
/// project path.
async fn readable_task_access(
    state: &AppState,
    project_id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<TaskAccess, AppError> {
    let resolved = resolve_task_access(&state.db, task_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if resolved.project_id != project_id || !resolved.access.can_read() {
        return Err(AppError::NotFound);
    }

    Ok(resolved)
}

/// GET /api/v1/projects/:id/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<TaskWithAssignee>>, AppError> {
    let access = resolve_access(&state.db, EntityKind::Project, project_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !access.can_read() {
        return Err(AppError::Forbidden);
    }

    type Row = (
        Uuid,
        Uuid,
        String,
        Option<String>,
        TaskStatus,
        Priority,
        Option<NaiveDate>,
        Option<Uuid>,
        chrono::DateTime<Utc>,
        chrono::DateTime<Utc>,
        Option<chrono::DateTime<Utc>>,
        Option<String>,
        Option<String>,
    );

    let rows: Vec<Row> = sqlx::query_as(
        r#"
        SELECT t.id, t.project_id, t.title, t.description, t.status, t.priority,
               t.due_date, t.assigned_to, t.created_at, t.updated_at, t.completed_at,
               u.full_name, u.email
        FROM tasks t
        LEFT JOIN users u ON u.id = t.assigned_to
        WHERE t.project_id = $1
        ORDER BY t.created_at ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let tasks = rows
        .into_iter()
        .map(|row| TaskWithAssignee {
            task: row_to_task((
                row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8, row.9, row.10,
            )),
            assigned_to_name: row.11,
            assigned_to_email: row.12,
        })
        .collect();

    Ok(Json(tasks))
}

/// POST /api/v1/projects/:id/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let access = resolve_access(&state.db, EntityKind::Project, project_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    // Any project member may create tasks.
    access.require(Capability::Read)?;

    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Task title is required".to_string()));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let status = req.status.unwrap_or(TaskStatus::PorHacer);
    let priority = req.priority.unwrap_or(Priority::Media);

    sqlx::query(
        r#"
        INSERT INTO tasks (id, project_id, title, description, status, priority,
                           due_date, assigned_to, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(project_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(status)
    .bind(priority)
    .bind(req.due_date)
    .bind(req.assigned_to)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::TaskCreated)
            .detail(format!("\"{}\"", req.title))
            .project(project_id),
    );

    Ok(Json(Task {
        id,
        project_id,
        title: req.title,
        description: req.description,
        status,
        priority,
        due_date: req.due_date,
        assigned_to: req.assigned_to,
        created_at: now,
        updated_at: now,
        completed_at: None,
    }))
}

/// GET /api/v1/projects/:id/tasks/:task_id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Task>, AppError> {
    readable_task_access(&state, project_id, task_id, user.id).await?;

    let query = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
    let row: TaskRow = sqlx::query_as(&query)
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(row_to_task(row)))
}

/// PATCH /api/v1/projects/:id/tasks/:task_id/status
///
/// The Kanban drag-and-drop path. Entering `Hecho` stamps `completed_at`,
/// leaving it clears the stamp.
pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskStatusRequest>,
) -> Result<Json<Task>, AppError> {
    readable_task_access(&state, project_id, task_id, user.id).await?;

    let now = Utc::now();
    let completed_at = req.status.is_done().then_some(now);

    let query = format!(
        r#"
        UPDATE tasks
        SET status = $1, updated_at = $2, completed_at = $3
        WHERE id = $4
        RETURNING {}
        "#,
        TASK_COLUMNS
    );
    let row: TaskRow = sqlx::query_as(&query)
        .bind(req.status)
        .bind(now)
        .bind(completed_at)
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;

    let task = row_to_task(row);

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::TaskStatusUpdated)
            .detail(format!("\"{}\" a \"{}\"", task.title, req.status.as_str()))
            .project(project_id),
    );

    Ok(Json(task))
}

/// PUT /api/v1/projects/:id/tasks/:task_id
///
/// Any member may edit task fields; changing the due date to a *different*
/// value additionally requires project admin rights.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    let resolved = readable_task_access(&state, project_id, task_id, user.id).await?;

    if let Some(new_due_date) = req.due_date {
        let (current,): (Option<NaiveDate>,) =
            sqlx::query_as("SELECT due_date FROM tasks WHERE id = $1")
                .bind(task_id)
                .fetch_one(&state.db)
                .await?;

        if current != Some(new_due_date) {
            resolved.access.require(Capability::Administer)?;
        }
    }

    let now = Utc::now();

    let query = format!(
        r#"
        UPDATE tasks
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            priority = COALESCE($3, priority),
            due_date = COALESCE($4, due_date),
            assigned_to = COALESCE($5, assigned_to),
            updated_at = $6
        WHERE id = $7
        RETURNING {}
        "#,
        TASK_COLUMNS
    );
    let row: TaskRow = sqlx::query_as(&query)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.priority)
        .bind(req.due_date)
        .bind(req.assigned_to)
        .bind(now)
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;

    let task = row_to_task(row);

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::TaskDetailsUpdated)
            .detail(format!("\"{}\"", task.title))
            .project(project_id),
    );

    Ok(Json(task))
}

/// DELETE /api/v1/projects/:id/tasks/:task_id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<(), AppError> {
    let resolved = readable_task_access(&state, project_id, task_id, user.id).await?;

    // Only project admins/creator may delete tasks.
    resolved.access.require(Capability::Administer)?;

    let row: (String,) = sqlx::query_as("DELETE FROM tasks WHERE id = $1 RETURNING title")
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::TaskDeleted)
            .detail(format!("\"{}\"", row.0))
            .project(project_id),
    );

    Ok(())
}
