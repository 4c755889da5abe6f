use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use hacerya_shared::{
    api::{UpdateUserDetailsRequest, UpdateUserPasswordRequest, UpdateUserStatusRequest},
    ActiveUser, DashboardKpis, ProjectTaskCount, StatusCount, TaskStatus, User, UserRole,
};
use uuid::Uuid;

use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::{hash_password, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;

async fn count(db: &crate::db::DbPool, query: &str) -> Result<i64, sqlx::Error> {
    let (n,): (i64,) = sqlx::query_as(query).fetch_one(db).await?;
    Ok(n)
}

/// GET /api/v1/admin/kpis
///
/// Headline totals. Personal projects and their tasks stay out of the
/// project and completion figures; workspaces are counted whole.
pub async fn kpis(State(state): State<AppState>) -> Result<Json<DashboardKpis>, AppError> {
    let total_users = count(&state.db, "SELECT COUNT(*) FROM users");
    let total_projects = count(
        &state.db,
        "SELECT COUNT(*) FROM projects WHERE is_personal = FALSE",
    );
    let total_workspaces = count(&state.db, "SELECT COUNT(*) FROM workspaces");
    let total_tasks_completed = count(
        &state.db,
        r#"
        SELECT COUNT(*)
        FROM tasks t
        JOIN projects p ON p.id = t.project_id
        WHERE t.status = 'Hecho' AND p.is_personal = FALSE
        "#,
    );

    let (total_users, total_projects, total_workspaces, total_tasks_completed) = tokio::try_join!(
        total_users,
        total_projects,
        total_workspaces,
        total_tasks_completed
    )?;

    Ok(Json(DashboardKpis {
        total_users,
        total_projects,
        total_workspaces,
        total_tasks_completed,
    }))
}

/// GET /api/v1/admin/tasks-by-status
pub async fn tasks_by_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<StatusCount>>, AppError> {
    let rows: Vec<(TaskStatus, i64)> = sqlx::query_as(
        r#"
        SELECT t.status, COUNT(*)
        FROM tasks t
        JOIN projects p ON p.id = t.project_id
        WHERE p.is_personal = FALSE
        GROUP BY t.status
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
    ))
}

/// GET /api/v1/admin/tasks-per-project
pub async fn tasks_per_project(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectTaskCount>>, AppError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT p.name, COUNT(t.id)
        FROM projects p
        LEFT JOIN tasks t ON t.project_id = p.id
        WHERE p.is_personal = FALSE
        GROUP BY p.id, p.name
        ORDER BY COUNT(t.id) DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(name, task_count)| ProjectTaskCount { name, task_count })
            .collect(),
    ))
}

/// GET /api/v1/admin/active-users
///
/// Bitácora entries tied to personal projects do not count towards the
/// activity ranking.
pub async fn active_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActiveUser>>, AppError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT u.full_name, COUNT(a.id)
        FROM activity_log a
        JOIN users u ON u.id = a.user_id
        LEFT JOIN projects p ON p.id = a.project_id
        WHERE a.project_id IS NULL OR p.is_personal = FALSE
        GROUP BY u.id, u.full_name
        ORDER BY COUNT(a.id) DESC
        LIMIT 5
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(full_name, action_count)| ActiveUser {
                full_name,
                action_count,
            })
            .collect(),
    ))
}

type UserRow = (
    Uuid,
    String,
    String,
    UserRole,
    hacerya_shared::AccountStatus,
    chrono::DateTime<Utc>,
);

fn row_to_user(row: UserRow) -> User {
    User {
        id: row.0,
        email: row.1,
        full_name: row.2,
        role: row.3,
        account_status: row.4,
        created_at: row.5,
    }
}

const USER_COLUMNS: &str = "id, email, full_name, role, account_status, created_at";

/// GET /api/v1/admin/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let query = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
    let rows: Vec<UserRow> = sqlx::query_as(&query).fetch_all(&state.db).await?;

    Ok(Json(rows.into_iter().map(row_to_user).collect()))
}

/// PATCH /api/v1/admin/users/:id/status
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<Json<User>, AppError> {
    if user_id == admin.id {
        return Err(AppError::Validation(
            "Administrators cannot change their own account status".to_string(),
        ));
    }

    let query = format!(
        "UPDATE users SET account_status = $1 WHERE id = $2 RETURNING {}",
        USER_COLUMNS
    );
    let row: Option<UserRow> = sqlx::query_as(&query)
        .bind(req.account_status)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;

    let user = row.map(row_to_user).ok_or(AppError::NotFound)?;

    state.activity.record(
        ActivityEvent::new(admin.id, ActivityAction::AdminStatusChange)
            .detail(format!("\"{}\"", user.full_name)),
    );

    Ok(Json(user))
}

/// PATCH /api/v1/admin/users/:id
pub async fn update_user_details(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserDetailsRequest>,
) -> Result<Json<User>, AppError> {
    if req.full_name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(AppError::Validation(
            "Full name and email are required".to_string(),
        ));
    }

    let taken: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id <> $2")
            .bind(&req.email)
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("Email is already in use".to_string()));
    }

    let query = format!(
        "UPDATE users SET full_name = $1, email = $2, role = $3 WHERE id = $4 RETURNING {}",
        USER_COLUMNS
    );
    let row: Option<UserRow> = sqlx::query_as(&query)
        .bind(&req.full_name)
        .bind(&req.email)
        .bind(req.role)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;

    let user = row.map(row_to_user).ok_or(AppError::NotFound)?;

    state.activity.record(
        ActivityEvent::new(admin.id, ActivityAction::AdminUserEdit)
            .detail(format!("\"{}\"", user.full_name)),
    );

    Ok(Json(user))
}

/// PATCH /api/v1/admin/users/:id/password
pub async fn update_user_password(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserPasswordRequest>,
) -> Result<(), AppError> {
    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;

    let row: Option<(String,)> = sqlx::query_as(
        "UPDATE users SET password_hash = $1 WHERE id = $2 RETURNING full_name",
    )
    .bind(&password_hash)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    let (full_name,) = row.ok_or(AppError::NotFound)?;

    state.activity.record(
        ActivityEvent::new(admin.id, ActivityAction::AdminPasswordChange)
            .detail(format!("\"{}\"", full_name)),
    );

    Ok(())
}
