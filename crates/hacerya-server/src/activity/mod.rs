//! Bitácora collaborator. Handlers emit an [`ActivityEvent`] after a
//! successful mutation; a background task renders the human-readable entry
//! and appends it. Logging is fire-and-forget: a failed insert is warned
//! about and dropped, it never rolls back or delays the mutation response.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::DbPool;

/// Everything the system records in the bitácora.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    UserRegistered,
    UserLoginSuccess,
    CreatedWorkspace,
    UpdatedWorkspaceDetails,
    DeletedWorkspace,
    MemberAdded,
    MemberRoleUpdated,
    MemberRemoved,
    CreatedProject,
    UpdatedProjectDetails,
    DeletedProject,
    ProjectMemberAdded,
    ProjectMemberRoleUpdated,
    ProjectMemberRemoved,
    TaskCreated,
    TaskStatusUpdated,
    TaskDetailsUpdated,
    TaskDeleted,
    TaskCommentAdded,
    AdminStatusChange,
    AdminUserEdit,
    AdminPasswordChange,
}

impl ActivityAction {
    /// The Spanish phrase the admin bitácora view displays, completed by the
    /// event's detail (entity name, member name, ...).
    fn phrase(&self) -> &'static str {
        match self {
            Self::UserRegistered => "creó su cuenta.",
            Self::UserLoginSuccess => "Inició Sesión Satisfactoriamente.",
            Self::CreatedWorkspace => "creó el espacio de trabajo:",
            Self::UpdatedWorkspaceDetails => "actualizó detalles del espacio de trabajo:",
            Self::DeletedWorkspace => "eliminó el espacio de trabajo:",
            Self::MemberAdded => "añadió un miembro:",
            Self::MemberRoleUpdated => "actualizó un rol:",
            Self::MemberRemoved => "eliminó un miembro:",
            Self::CreatedProject => "creó el proyecto:",
            Self::UpdatedProjectDetails => "actualizó detalles del proyecto:",
            Self::DeletedProject => "eliminó el proyecto:",
            Self::ProjectMemberAdded => "añadió un miembro al proyecto:",
            Self::ProjectMemberRoleUpdated => "actualizó un rol en el proyecto:",
            Self::ProjectMemberRemoved => "eliminó un miembro del proyecto:",
            Self::TaskCreated => "creó la tarea:",
            Self::TaskStatusUpdated => "actualizó el estado de una tarea:",
            Self::TaskDetailsUpdated => "actualizó detalles de la tarea:",
            Self::TaskDeleted => "eliminó la tarea:",
            Self::TaskCommentAdded => "comentó en la tarea:",
            Self::AdminStatusChange => "cambió el estado de una cuenta:",
            Self::AdminUserEdit => "actualizó los datos de un usuario:",
            Self::AdminPasswordChange => "cambió la contraseña de un usuario:",
        }
    }
}

#[derive(Debug)]
pub struct ActivityEvent {
    pub actor_id: Uuid,
    pub action: ActivityAction,
    /// Free-form completion of the phrase, e.g. the affected entity's name.
    pub detail: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl ActivityEvent {
    pub fn new(actor_id: Uuid, action: ActivityAction) -> Self {
        Self {
            actor_id,
            action,
            detail: None,
            workspace_id: None,
            project_id: None,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    pub fn project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }
}

fn render_message(actor_name: &str, action: ActivityAction, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("{} {} {}", actor_name, action.phrase(), detail),
        None => format!("{} {}", actor_name, action.phrase()),
    }
}

/// Sending half of the bitácora channel, cloned into every handler through
/// the application state.
#[derive(Clone)]
pub struct ActivityLogger {
    tx: mpsc::UnboundedSender<ActivityEvent>,
}

impl ActivityLogger {
    /// Spawns the consumer task and returns the handle handlers record with.
    pub fn spawn(db: DbPool) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ActivityEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = insert_entry(&db, &event).await {
                    tracing::warn!(?event, %err, "failed to append activity log entry");
                }
            }
        });

        Self { tx }
    }

    /// Fire-and-forget append. The send only fails when the consumer is gone,
    /// i.e. during shutdown.
    pub fn record(&self, event: ActivityEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("activity log consumer is gone, entry dropped");
        }
    }
}

async fn insert_entry(db: &DbPool, event: &ActivityEvent) -> Result<(), sqlx::Error> {
    let actor: Option<(String,)> = sqlx::query_as("SELECT full_name FROM users WHERE id = $1")
        .bind(event.actor_id)
        .fetch_optional(db)
        .await?;

    let actor_name = actor
        .map(|(name,)| name)
        .unwrap_or_else(|| "Usuario Desconocido".to_string());

    let message = render_message(&actor_name, event.action, event.detail.as_deref());

    sqlx::query(
        r#"
        INSERT INTO activity_log (id, user_id, workspace_id, project_id, action)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.actor_id)
    .bind(event.workspace_id)
    .bind(event.project_id)
    .bind(&message)
    .execute(db)
    .await?;

    tracing::debug!("[bitácora] {}", message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_includes_actor_phrase_and_detail() {
        let msg = render_message(
            "Ana Pérez",
            ActivityAction::CreatedProject,
            Some("Rediseño Web"),
        );
        assert_eq!(msg, "Ana Pérez creó el proyecto: Rediseño Web");
    }

    #[test]
    fn message_without_detail_is_just_the_phrase() {
        let msg = render_message("Ana Pérez", ActivityAction::UserLoginSuccess, None);
        assert_eq!(msg, "Ana Pérez Inició Sesión Satisfactoriamente.");
    }
}
