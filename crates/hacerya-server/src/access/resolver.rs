//! Store-facing half of the resolver: reads the entity row and the actor's
//! membership row, then hands both to the pure derivation in `access`.

use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use hacerya_shared::MemberRole;

use super::{Access, EntityKind, EntityRef};

async fn fetch_entity(
    db: &DbPool,
    kind: EntityKind,
    entity_id: Uuid,
) -> Result<Option<EntityRef>, AppError> {
    let query = match kind {
        EntityKind::Workspace => "SELECT id, created_by, is_personal FROM workspaces WHERE id = $1",
        EntityKind::Project => "SELECT id, created_by, is_personal FROM projects WHERE id = $1",
    };

    let row: Option<(Uuid, Uuid, bool)> = sqlx::query_as(query)
        .bind(entity_id)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|(id, created_by, is_personal)| EntityRef {
        id,
        created_by,
        is_personal,
    }))
}

async fn fetch_membership(
    db: &DbPool,
    kind: EntityKind,
    entity_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MemberRole>, AppError> {
    let query = match kind {
        EntityKind::Workspace => {
            "SELECT role FROM workspace_members WHERE workspace_id = $1 AND user_id = $2"
        }
        EntityKind::Project => {
            "SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2"
        }
    };

    let row: Option<(MemberRole,)> = sqlx::query_as(query)
        .bind(entity_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|(role,)| role))
}

/// Resolves the actor's [`Access`] on one workspace/project. `None` means the
/// entity row does not exist; the caller decides how (not) to disclose that.
/// The two lookups are commutative, so they run concurrently.
pub async fn resolve_access(
    db: &DbPool,
    kind: EntityKind,
    entity_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Access>, AppError> {
    let (entity, membership) = tokio::try_join!(
        fetch_entity(db, kind, entity_id),
        fetch_membership(db, kind, entity_id, user_id),
    )?;

    Ok(entity.map(|e| Access::derive(e, membership, user_id)))
}

/// A task's access scope is entirely its parent project's.
#[derive(Debug, Clone, Copy)]
pub struct TaskAccess {
    pub project_id: Uuid,
    pub access: Access,
}

/// Looks up the task's project and delegates. `None` means the task does not
/// exist; callers must report that as not-found, not as a denial.
pub async fn resolve_task_access(
    db: &DbPool,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TaskAccess>, AppError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT project_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(db)
        .await?;

    let Some((project_id,)) = row else {
        return Ok(None);
    };

    // The FK guarantees the project row exists.
    let access = resolve_access(db, EntityKind::Project, project_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Some(TaskAccess { project_id, access }))
}
