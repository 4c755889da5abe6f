use axum::{
    extract::{Path, State},
    Extension, Json,
};
use hacerya_shared::{
    api::{AddMemberRequest, AddMemberResponse, UpdateMemberRoleRequest},
    Member, MemberRole,
};
use uuid::Uuid;

use crate::access::{resolve_access, Access, Capability, EntityKind};
use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

use super::workspace_members::membership_inserted;

async fn project_access(
    state: &AppState,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Access, AppError> {
    resolve_access(&state.db, EntityKind::Project, project_id, user_id)
        .await?
        .ok_or(AppError::NotFound)
}

async fn log_names(
    state: &AppState,
    project_id: Uuid,
    member_id: Uuid,
) -> Result<(String, String), AppError> {
    let project = sqlx::query_as::<_, (String,)>("SELECT name FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(&state.db);
    let member = sqlx::query_as::<_, (String,)>("SELECT full_name FROM users WHERE id = $1")
        .bind(member_id)
        .fetch_optional(&state.db);

    let (project, member) = tokio::try_join!(project, member)?;

    Ok((
        project
            .map(|(n,)| n)
            .unwrap_or_else(|| "Proyecto Desconocido".to_string()),
        member
            .map(|(n,)| n)
            .unwrap_or_else(|| "Miembro Desconocido".to_string()),
    ))
}

/// GET /api/v1/projects/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Member>>, AppError> {
    let access = project_access(&state, project_id, user.id).await?;

    if !access.can_read() {
        return Err(AppError::NotFound);
    }

    let rows: Vec<(Uuid, String, String, MemberRole)> = sqlx::query_as(
        r#"
        SELECT u.id, u.full_name, u.email, pm.role
        FROM project_members pm
        JOIN users u ON u.id = pm.user_id
        WHERE pm.project_id = $1
        ORDER BY u.full_name
        "#,
    )
    .bind(project_id)
    .fetch_all(&state.db)
    .await?;

    let members = rows
        .into_iter()
        .map(|(user_id, full_name, email, role)| Member {
            user_id,
            full_name,
            email,
            role,
        })
        .collect();

    Ok(Json(members))
}

/// POST /api/v1/projects/:id/members
///
/// For a workspace project the candidate must already belong to the parent
/// workspace; people are invited to the workspace first, then to projects
/// inside it.
pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<AddMemberResponse>, AppError> {
    if req.member_email.trim().is_empty() {
        return Err(AppError::Validation(
            "Member email is required".to_string(),
        ));
    }

    let access = project_access(&state, project_id, user.id).await?;
    access.require(Capability::ManageMembers)?;

    let member: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, full_name FROM users WHERE email = $1")
            .bind(&req.member_email)
            .fetch_optional(&state.db)
            .await?;

    let (member_id, member_name) = member.ok_or(AppError::NotFound)?;

    let (workspace_id,): (Option<Uuid>,) =
        sqlx::query_as("SELECT workspace_id FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_one(&state.db)
            .await?;

    if let Some(workspace_id) = workspace_id {
        let parent = resolve_access(&state.db, EntityKind::Workspace, workspace_id, member_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !parent.can_read() {
            return Err(AppError::InvariantViolation(
                "User must be a member of the parent workspace first".to_string(),
            ));
        }
    }

    let result = sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (project_id, user_id) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(member_id)
    .bind(req.role)
    .execute(&state.db)
    .await?;

    let already_member = !membership_inserted(result.rows_affected());

    if !already_member {
        let (project_name, _) = log_names(&state, project_id, member_id).await?;
        state.activity.record(
            ActivityEvent::new(user.id, ActivityAction::ProjectMemberAdded)
                .detail(format!("{} a \"{}\"", member_name, project_name))
                .project(project_id),
        );
    }

    Ok(Json(AddMemberResponse {
        user_id: member_id,
        role: req.role,
        already_member,
    }))
}

/// PUT /api/v1/projects/:id/members/:user_id
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<Member>, AppError> {
    let access = project_access(&state, project_id, user.id).await?;
    access.require(Capability::ManageMembers)?;

    let result =
        sqlx::query("UPDATE project_members SET role = $1 WHERE project_id = $2 AND user_id = $3")
            .bind(req.role)
            .bind(project_id)
            .bind(member_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    let row: (String, String) = sqlx::query_as("SELECT full_name, email FROM users WHERE id = $1")
        .bind(member_id)
        .fetch_one(&state.db)
        .await?;

    let (project_name, member_name) = log_names(&state, project_id, member_id).await?;
    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::ProjectMemberRoleUpdated)
            .detail(format!(
                "Rol de \"{}\" a {} en \"{}\"",
                member_name,
                req.role.as_str(),
                project_name
            ))
            .project(project_id),
    );

    Ok(Json(Member {
        user_id: member_id,
        full_name: row.0,
        email: row.1,
        role: req.role,
    }))
}

/// DELETE /api/v1/projects/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<(), AppError> {
    let access = project_access(&state, project_id, user.id).await?;
    access.require(Capability::ManageMembers)?;
    access.forbid_creator_removal(member_id)?;

    let (project_name, member_name) = log_names(&state, project_id, member_id).await?;

    let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(member_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::ProjectMemberRemoved)
            .detail(format!("\"{}\" de \"{}\"", member_name, project_name))
            .project(project_id),
    );

    Ok(())
}
