use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use hacerya_shared::{
    api::{CreateCommentRequest, UpdateCommentRequest},
    Comment, CommentWithAuthor,
};
use uuid::Uuid;

use crate::access::{resolve_task_access, Capability, TaskAccess};
use crate::activity::{ActivityAction, ActivityEvent};
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

/// Resolves the comment chain through the task. A missing task, or one
/// reached through the wrong project path, folds into not-found; a task the
/// caller cannot read is a plain denial since reaching the thread already
/// implies knowing the task exists.
async fn commentable_task(
    state: &AppState,
    project_id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<TaskAccess, AppError> {
    let resolved = resolve_task_access(&state.db, task_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if resolved.project_id != project_id {
        return Err(AppError::NotFound);
    }

    if !resolved.access.can_read() {
        return Err(AppError::Forbidden);
    }

    Ok(resolved)
}

/// GET /api/v1/projects/:id/tasks/:task_id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<CommentWithAuthor>>, AppError> {
    commentable_task(&state, project_id, task_id, user.id).await?;

    type Row = (
        Uuid,
        Uuid,
        Uuid,
        String,
        chrono::DateTime<Utc>,
        Option<String>,
        Option<String>,
    );

    let rows: Vec<Row> = sqlx::query_as(
        r#"
        SELECT c.id, c.task_id, c.user_id, c.content, c.created_at,
               u.full_name, u.email
        FROM task_comments c
        LEFT JOIN users u ON u.id = c.user_id
        WHERE c.task_id = $1
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(task_id)
    .fetch_all(&state.db)
    .await?;

    let comments = rows
        .into_iter()
        .map(|row| CommentWithAuthor {
            comment: Comment {
                id: row.0,
                task_id: row.1,
                user_id: row.2,
                content: row.3,
                created_at: row.4,
            },
            author_name: row.5,
            author_email: row.6,
        })
        .collect();

    Ok(Json(comments))
}

/// POST /api/v1/projects/:id/tasks/:task_id/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<CommentWithAuthor>, AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::Validation(
            "Comment content is required".to_string(),
        ));
    }

    commentable_task(&state, project_id, task_id, user.id).await?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO task_comments (id, task_id, user_id, content, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(task_id)
    .bind(user.id)
    .bind(&req.content)
    .bind(now)
    .execute(&state.db)
    .await?;

    let author: (String, String) =
        sqlx::query_as("SELECT full_name, email FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&state.db)
            .await?;

    let (title,): (String,) = sqlx::query_as("SELECT title FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_one(&state.db)
        .await?;

    state.activity.record(
        ActivityEvent::new(user.id, ActivityAction::TaskCommentAdded)
            .detail(format!("\"{}\"", title))
            .project(project_id),
    );

    Ok(Json(CommentWithAuthor {
        comment: Comment {
            id,
            task_id,
            user_id: user.id,
            content: req.content,
            created_at: now,
        },
        author_name: Some(author.0),
        author_email: Some(author.1),
    }))
}

/// PUT /api/v1/projects/:id/tasks/:task_id/comments/:comment_id
///
/// Only the author may edit a comment. The ownership check lives in the
/// WHERE clause so a foreign comment and a missing one are told apart by a
/// follow-up existence probe.
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    if req.content.trim().is_empty() {
        return Err(AppError::Validation(
            "Comment content is required".to_string(),
        ));
    }

    commentable_task(&state, project_id, task_id, user.id).await?;

    let row: Option<(Uuid, Uuid, Uuid, String, chrono::DateTime<Utc>)> = sqlx::query_as(
        r#"
        UPDATE task_comments
        SET content = $1
        WHERE id = $2 AND task_id = $3 AND user_id = $4
        RETURNING id, task_id, user_id, content, created_at
        "#,
    )
    .bind(&req.content)
    .bind(comment_id)
    .bind(task_id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;

    match row {
        Some((id, task_id, user_id, content, created_at)) => Ok(Json(Comment {
            id,
            task_id,
            user_id,
            content,
            created_at,
        })),
        None => {
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM task_comments WHERE id = $1 AND task_id = $2")
                    .bind(comment_id)
                    .bind(task_id)
                    .fetch_optional(&state.db)
                    .await?;
            match exists {
                Some(_) => Err(AppError::Forbidden),
                None => Err(AppError::NotFound),
            }
        }
    }
}

/// DELETE /api/v1/projects/:id/tasks/:task_id/comments/:comment_id
///
/// The author may always delete their own comment; project admins may
/// moderate anyone's.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((project_id, task_id, comment_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<(), AppError> {
    let resolved = commentable_task(&state, project_id, task_id, user.id).await?;

    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM task_comments WHERE id = $1 AND task_id = $2")
            .bind(comment_id)
            .bind(task_id)
            .fetch_optional(&state.db)
            .await?;

    let (author_id,) = row.ok_or(AppError::NotFound)?;

    if author_id != user.id && !resolved.access.allows(Capability::Administer) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM task_comments WHERE id = $1")
        .bind(comment_id)
        .execute(&state.db)
        .await?;

    Ok(())
}
