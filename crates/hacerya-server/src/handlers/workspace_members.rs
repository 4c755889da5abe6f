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

/// `ON CONFLICT DO NOTHING` reports a duplicate add as zero affected rows;
/// exactly one row means the membership is new.
pub(crate) fn membership_inserted(rows_affected: u64) -> bool {
    rows_affected == 1
}

async fn workspace_access(
    state: &AppState,
    workspace_id: Uuid,
    user_id: Uuid,
) -> Result<Access, AppError> {
    resolve_access(&state.db, EntityKind::Workspace, workspace_id, user_id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Names for the bitácora entry. The two lookups are independent, so they
/// run concurrently.
async fn log_names(
    state: &AppState,
    workspace_id: Uuid,
    member_id: Uuid,
) -> Result<(String, String), AppError> {
    let workspace = sqlx::query_as::<_, (String,)>("SELECT name FROM workspaces WHERE id = $1")
        .bind(workspace_id)
        .fetch_optional(&state.db);
    let member = sqlx::query_as::<_, (String,)>("SELECT full_name FROM users WHERE id = $1")
        .bind(member_id)
        .fetch_optional(&state.db);

    let (workspace, member) = tokio::try_join!(workspace, member)?;

    Ok((
        workspace
            .map(|(n,)| n)
            .unwrap_or_else(|| "Workspace Desconocido".to_string()),
        member
            .map(|(n,)| n)
            .unwrap_or_else(|| "Miembro Desconocido".to_string()),
    ))
}

/// GET /api/v1/workspaces/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<Vec<Member>>, AppError> {
    let access = workspace_access(&state, workspace_id, user.id).await?;

    // Same denial shape as a nonexistent workspace: membership lists must not
    // leak existence to outsiders.
    if !access.can_read() {
        return Err(AppError::NotFound);
    }

    let rows: Vec<(Uuid, String, String, MemberRole)> = sqlx::query_as(
        r#"
        SELECT u.id, u.full_name, u.email, wm.role
        FROM workspace_members wm
        JOIN users u ON u.id = wm.user_id
        WHERE wm.workspace_id = $1
        ORDER BY u.full_name
        "#,
    )
    .bind(workspace_id)
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

/// POST /api/v1/workspaces/:id/members
pub async fn add_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(workspace_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<AddMemberResponse>, AppError> {
    if req.member_email.trim().is_empty() {
        return Err(AppError::Validation(
            "Member email is required".to_string(),
        ));
    }

    let access = workspace_access(&state, workspace_id, user.id).await?;
    access.require(Capability::ManageMembers)?;

    let member: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, full_name FROM users WHERE email = $1")
            .bind(&req.member_email)
            .fetch_optional(&state.db)
            .await?;

    let (member_id, member_name) = member.ok_or(AppError::NotFound)?;

    // Duplicate adds are a silent no-op at the store; the uniqueness
    // constraint decides, not a read-then-write.
    let result = sqlx::query(
        r#"
        INSERT INTO workspace_members (workspace_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (workspace_id, user_id) DO NOTHING
        "#,
    )
    .bind(workspace_id)
    .bind(member_id)
    .bind(req.role)
    .execute(&state.db)
    .await?;

    let already_member = !membership_inserted(result.rows_affected());

    if !already_member {
        let (workspace_name, _) = log_names(&state, workspace_id, member_id).await?;
        state.activity.record(
            ActivityEvent::new(user.id, ActivityAction::MemberAdded)
                .detail(format!("{} a \"{}\"", member_name, workspace_name))
                .workspace(workspace_id),
        );
    }

    Ok(Json(AddMemberResponse {
        user_id: member_id,
        role: req.role,
        already_member,
    }))
}

/// PUT /api/v1/workspaces/:id/members/:user_id
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> Result<Json<Member>, AppError> {
    let access = workspace_access(&state, workspace_id, user.id).await?;
    access.require(Capability::ManageMembers)?;

    let result = sqlx::query(
        "UPDATE workspace_members SET role = $1 WHERE workspace_id = $2 AND user_id = $3",
    )
    .bind(req.role)
    .bind(workspace_id)
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

    let (workspace_name, member_name) = log_names(&state, workspace_id, member_id).await?;
    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::MemberRoleUpdated)
            .detail(format!(
                "Rol de \"{}\" a {} en \"{}\"",
                member_name,
                req.role.as_str(),
                workspace_name
            ))
            .workspace(workspace_id),
    );

    Ok(Json(Member {
        user_id: member_id,
        full_name: row.0,
        email: row.1,
        role: req.role,
    }))
}

/// DELETE /api/v1/workspaces/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<(), AppError> {
    let access = workspace_access(&state, workspace_id, user.id).await?;
    access.require(Capability::ManageMembers)?;
    access.forbid_creator_removal(member_id)?;

    let (workspace_name, member_name) = log_names(&state, workspace_id, member_id).await?;

    let result =
        sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2")
            .bind(workspace_id)
            .bind(member_id)
            .execute(&state.db)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::MemberRemoved)
            .detail(format!("\"{}\" de \"{}\"", member_name, workspace_name))
            .workspace(workspace_id),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Adding someone who already holds a membership must report
    // `already_member` instead of failing or double-inserting.
    #[test]
    fn duplicate_add_counts_as_already_member() {
        assert!(membership_inserted(1));
        assert!(!membership_inserted(0));
    }
}
