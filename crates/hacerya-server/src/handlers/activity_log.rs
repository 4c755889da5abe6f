use axum::{extract::State, Json};
use chrono::Utc;
use hacerya_shared::ActivityEntry;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

/// GET /api/v1/activity-log
///
/// Global bitácora, newest first, capped at the last 100 entries. Reached
/// only through the admin-gated router.
pub async fn list_activity_log(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    type Row = (
        Uuid,
        String,
        chrono::DateTime<Utc>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );

    let rows: Vec<Row> = sqlx::query_as(
        r#"
        SELECT a.id, a.action, a.created_at,
               u.full_name, u.email, w.name, p.name
        FROM activity_log a
        LEFT JOIN users u ON u.id = a.user_id
        LEFT JOIN workspaces w ON w.id = a.workspace_id
        LEFT JOIN projects p ON p.id = a.project_id
        ORDER BY a.created_at DESC
        LIMIT 100
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let entries = rows
        .into_iter()
        .map(|row| ActivityEntry {
            id: row.0,
            action: row.1,
            created_at: row.2,
            user_name: row.3,
            user_email: row.4,
            workspace_name: row.5,
            project_name: row.6,
        })
        .collect();

    Ok(Json(entries))
}
