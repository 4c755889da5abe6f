use axum::{extract::State, Extension, Json};
use chrono::Utc;
use hacerya_shared::{
    api::{AuthResponse, LoginRequest, RegisterRequest},
    AccountStatus, User, UserRole,
};
use uuid::Uuid;

use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::{create_token, hash_password, verify_password, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;

type UserRow = (
    Uuid,
    String,
    String,
    UserRole,
    AccountStatus,
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

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.trim().is_empty() || req.full_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Email and full name are required".to_string(),
        ));
    }

    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, role, account_status, created_at)
        VALUES ($1, $2, $3, $4, 'user', 'active', $5)
        "#,
    )
    .bind(user_id)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.full_name)
    .bind(now)
    .execute(&state.db)
    .await?;

    state
        .activity
        .record(ActivityEvent::new(user_id, ActivityAction::UserRegistered));

    let token = create_token(
        user_id,
        &req.email,
        UserRole::User,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: User {
            id: user_id,
            email: req.email,
            full_name: req.full_name,
            role: UserRole::User,
            account_status: AccountStatus::Active,
            created_at: now,
        },
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let row: Option<(
        Uuid,
        String,
        String,
        String,
        UserRole,
        AccountStatus,
        chrono::DateTime<Utc>,
    )> = sqlx::query_as(
        r#"
        SELECT id, email, password_hash, full_name, role, account_status, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&req.email)
    .fetch_optional(&state.db)
    .await?;

    // Same response for unknown email and wrong password.
    let (id, email, password_hash, full_name, role, account_status, created_at) =
        row.ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &password_hash)? {
        return Err(AppError::Unauthorized);
    }

    if account_status == AccountStatus::Blocked {
        return Err(AppError::InvariantViolation(
            "Account is blocked".to_string(),
        ));
    }

    let token = create_token(
        id,
        &email,
        role,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    state
        .activity
        .record(ActivityEvent::new(id, ActivityAction::UserLoginSuccess));

    Ok(Json(AuthResponse {
        token,
        user: User {
            id,
            email,
            full_name,
            role,
            account_status,
            created_at,
        },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, email, full_name, role, account_status, created_at FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;

    let row = row.ok_or(AppError::NotFound)?;
    Ok(Json(row_to_user(row)))
}
