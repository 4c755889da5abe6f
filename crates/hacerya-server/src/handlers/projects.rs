use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use hacerya_shared::{
    api::{CreateProjectRequest, UpdateProjectRequest},
    MemberRole, Project, ProjectWithRole,
};
use uuid::Uuid;

use crate::access::{resolve_access, Capability, EntityKind};
use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

type ProjectRow = (
    Uuid,
    String,
    Option<String>,
    Option<Uuid>,
    Uuid,
    bool,
    chrono::DateTime<Utc>,
    chrono::DateTime<Utc>,
);

fn row_to_project(row: ProjectRow) -> Project {
    Project {
        id: row.0,
        name: row.1,
        description: row.2,
        workspace_id: row.3,
        created_by: row.4,
        is_personal: row.5,
        created_at: row.6,
        updated_at: row.7,
    }
}

/// POST /api/v1/projects
///
/// Personal projects never carry a workspace; workspace projects require the
/// creator to already be a member of the parent workspace. As with
/// workspaces, no creator membership row is written.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Project name is required".to_string()));
    }

    let workspace_id = if req.is_personal { None } else { req.workspace_id };

    if let Some(workspace_id) = workspace_id {
        let access = resolve_access(&state.db, EntityKind::Workspace, workspace_id, user.id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !access.can_read() {
            return Err(AppError::Forbidden);
        }
    }

    let project_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, description, workspace_id, created_by, is_personal, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(project_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(workspace_id)
    .bind(user.id)
    .bind(req.is_personal)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    let mut event = ActivityEvent::new(user.id, ActivityAction::CreatedProject)
        .detail(req.name.clone())
        .project(project_id);
    if let Some(workspace_id) = workspace_id {
        event = event.workspace(workspace_id);
    }
    state.activity.record(event);

    Ok(Json(Project {
        id: project_id,
        name: req.name,
        description: req.description,
        workspace_id,
        created_by: user.id,
        is_personal: req.is_personal,
        created_at: now,
        updated_at: now,
    }))
}

/// GET /api/v1/projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ProjectWithRole>>, AppError> {
    type Row = (
        Uuid,
        String,
        Option<String>,
        Option<Uuid>,
        Uuid,
        bool,
        chrono::DateTime<Utc>,
        chrono::DateTime<Utc>,
        Option<MemberRole>,
    );

    let rows: Vec<Row> = sqlx::query_as(
        r#"
        SELECT DISTINCT p.id, p.name, p.description, p.workspace_id, p.created_by,
               p.is_personal, p.created_at, p.updated_at, pm_user.role
        FROM projects p
        LEFT JOIN project_members pm ON pm.project_id = p.id
        LEFT JOIN project_members pm_user ON pm_user.project_id = p.id AND pm_user.user_id = $1
        WHERE p.created_by = $1 OR pm.user_id = $1
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let projects = rows
        .into_iter()
        .map(|row| ProjectWithRole {
            project: row_to_project((
                row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7,
            )),
            current_user_role: row.8,
        })
        .collect();

    Ok(Json(projects))
}

/// GET /api/v1/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let access = resolve_access(&state.db, EntityKind::Project, project_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !access.can_read() {
        return Err(AppError::NotFound);
    }

    let row: ProjectRow = sqlx::query_as(
        r#"
        SELECT id, name, description, workspace_id, created_by, is_personal, created_at, updated_at
        FROM projects
        WHERE id = $1
        "#,
    )
    .bind(project_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(row_to_project(row)))
}

/// PUT /api/v1/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let access = resolve_access(&state.db, EntityKind::Project, project_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    access.require(Capability::Administer)?;

    let now = Utc::now();

    let row: ProjectRow = sqlx::query_as(
        r#"
        UPDATE projects
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = $3
        WHERE id = $4
        RETURNING id, name, description, workspace_id, created_by, is_personal, created_at, updated_at
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(now)
    .bind(project_id)
    .fetch_one(&state.db)
    .await?;

    let project = row_to_project(row);

    let mut event = ActivityEvent::new(user.id, ActivityAction::UpdatedProjectDetails)
        .detail(project.name.clone())
        .project(project_id);
    if let Some(workspace_id) = project.workspace_id {
        event = event.workspace(workspace_id);
    }
    state.activity.record(event);

    Ok(Json(project))
}

/// DELETE /api/v1/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<(), AppError> {
    let access = resolve_access(&state.db, EntityKind::Project, project_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    access.require(Capability::Administer)?;

    // The project id is gone after the delete, so the entry only points at
    // the parent workspace.
    let row: (String, Option<Uuid>) =
        sqlx::query_as("DELETE FROM projects WHERE id = $1 RETURNING name, workspace_id")
            .bind(project_id)
            .fetch_one(&state.db)
            .await?;

    let mut event = ActivityEvent::new(user.id, ActivityAction::DeletedProject).detail(row.0);
    if let Some(workspace_id) = row.1 {
        event = event.workspace(workspace_id);
    }
    state.activity.record(event);

    Ok(())
}
