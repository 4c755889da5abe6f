use axum::{extract::State, Extension, Json};
use hacerya_shared::{StatusCount, TaskStatus, UserStats};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

/// GET /api/v1/stats/me
///
/// Workload view over every task assigned to the caller, across all
/// projects including personal ones.
pub async fn my_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserStats>, AppError> {
    let active = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM tasks WHERE assigned_to = $1 AND status <> 'Hecho'",
    )
    .bind(user.id)
    .fetch_one(&state.db);

    let overdue = sqlx::query_as::<_, (i64,)>(
        r#"
        SELECT COUNT(*)
        FROM tasks
        WHERE assigned_to = $1 AND status <> 'Hecho'
          AND due_date IS NOT NULL AND due_date < CURRENT_DATE
        "#,
    )
    .bind(user.id)
    .fetch_one(&state.db);

    let by_status = sqlx::query_as::<_, (TaskStatus, i64)>(
        r#"
        SELECT status, COUNT(*)
        FROM tasks
        WHERE assigned_to = $1 AND status <> 'Hecho'
        GROUP BY status
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db);

    // Punctuality only makes sense for completed tasks that had a deadline.
    let punctuality = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            COUNT(CASE WHEN completed_at::date <= due_date THEN 1 END),
            COUNT(CASE WHEN completed_at::date > due_date THEN 1 END)
        FROM tasks
        WHERE assigned_to = $1 AND status = 'Hecho'
          AND completed_at IS NOT NULL AND due_date IS NOT NULL
        "#,
    )
    .bind(user.id)
    .fetch_one(&state.db);

    let lead_time = sqlx::query_as::<_, (f64,)>(
        r#"
        SELECT COALESCE(
            AVG(EXTRACT(EPOCH FROM (completed_at - created_at)))::float8 / 86400.0,
            0
        )
        FROM tasks
        WHERE assigned_to = $1 AND status = 'Hecho' AND completed_at IS NOT NULL
        "#,
    )
    .bind(user.id)
    .fetch_one(&state.db);

    let ((total_active,), (total_overdue,), by_status, (on_time, late), (avg_lead,)) =
        tokio::try_join!(active, overdue, by_status, punctuality, lead_time)?;

    Ok(Json(UserStats {
        total_active,
        total_overdue,
        active_by_status: by_status
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        completed_on_time: on_time,
        completed_late: late,
        avg_lead_time_days: avg_lead,
    }))
}
