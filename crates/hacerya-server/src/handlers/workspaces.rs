use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use hacerya_shared::{
    api::{CreateWorkspaceRequest, UpdateWorkspaceRequest},
    Workspace,
};
use uuid::Uuid;

use crate::access::{resolve_access, Capability, EntityKind};
use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

type WorkspaceRow = (
    Uuid,
    String,
    Option<String>,
    Uuid,
    bool,
    chrono::DateTime<Utc>,
    chrono::DateTime<Utc>,
);

fn row_to_workspace(row: WorkspaceRow) -> Workspace {
    Workspace {
        id: row.0,
        name: row.1,
        description: row.2,
        created_by: row.3,
        is_personal: row.4,
        created_at: row.5,
        updated_at: row.6,
    }
}

/// POST /api/v1/workspaces
///
/// The creator is NOT inserted into `workspace_members`; ownership is derived
/// from `created_by` everywhere.
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<Json<Workspace>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Workspace name is required".to_string(),
        ));
    }

    let workspace_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO workspaces (id, name, description, created_by, is_personal, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(workspace_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(user.id)
    .bind(req.is_personal)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::CreatedWorkspace)
            .detail(req.name.clone())
            .workspace(workspace_id),
    );

    Ok(Json(Workspace {
        id: workspace_id,
        name: req.name,
        description: req.description,
        created_by: user.id,
        is_personal: req.is_personal,
        created_at: now,
        updated_at: now,
    }))
}

/// GET /api/v1/workspaces
pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Workspace>>, AppError> {
    let rows: Vec<WorkspaceRow> = sqlx::query_as(
        r#"
        SELECT DISTINCT w.id, w.name, w.description, w.created_by, w.is_personal,
               w.created_at, w.updated_at
        FROM workspaces w
        LEFT JOIN workspace_members wm ON wm.workspace_id = w.id
        WHERE w.created_by = $1 OR wm.user_id = $1
        ORDER BY w.created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(row_to_workspace).collect()))
}

/// GET /api/v1/workspaces/:id
pub async fn get_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Workspace>, AppError> {
    let access = resolve_access(&state.db, EntityKind::Workspace, workspace_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    // Non-members get the same answer as for a nonexistent workspace.
    if !access.can_read() {
        return Err(AppError::NotFound);
    }

    let row: WorkspaceRow = sqlx::query_as(
        r#"
        SELECT id, name, description, created_by, is_personal, created_at, updated_at
        FROM workspaces
        WHERE id = $1
        "#,
    )
    .bind(workspace_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row_to_workspace(row)))
}

/// PUT /api/v1/workspaces/:id
pub async fn update_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> Result<Json<Workspace>, AppError> {
    let access = resolve_access(&state.db, EntityKind::Workspace, workspace_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    access.require(Capability::Administer)?;

    let now = Utc::now();

    let row: WorkspaceRow = sqlx::query_as(
        r#"
        UPDATE workspaces
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = $3
        WHERE id = $4
        RETURNING id, name, description, created_by, is_personal, created_at, updated_at
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(now)
    .bind(workspace_id)
    .fetch_one(&state.db)
    .await?;

    let workspace = row_to_workspace(row);

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::UpdatedWorkspaceDetails)
            .detail(workspace.name.clone())
            .workspace(workspace_id),
    );

    Ok(Json(workspace))
}

/// DELETE /api/v1/workspaces/:id
pub async fn delete_workspace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> Result<(), AppError> {
    let access = resolve_access(&state.db, EntityKind::Workspace, workspace_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    access.require(Capability::Administer)?;

    // Cascades to members, projects, tasks and comments.
    let row: (String,) = sqlx::query_as("DELETE FROM workspaces WHERE id = $1 RETURNING name")
        .bind(workspace_id)
        .fetch_one(&state.db)
        .await?;

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::DeletedWorkspace).detail(row.0),
    );

    Ok(())
}
