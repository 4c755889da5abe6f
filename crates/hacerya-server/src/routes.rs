use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::activity::ActivityLogger;
use crate::auth::{admin_only_middleware, auth_middleware};
use crate::config::Config;
use crate::db::DbPool;
use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub activity: ActivityLogger,
}

pub fn create_router(db: DbPool, config: Config) -> Router {
    let activity = ActivityLogger::spawn(db.clone());
    let state = AppState {
        db,
        config,
        activity,
    };

    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route(
            "/me",
            get(handlers::auth::me).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        );

    let workspace_routes = Router::new()
        .route(
            "/",
            post(handlers::workspaces::create_workspace)
                .get(handlers::workspaces::list_workspaces),
        )
        .route(
            "/:id",
            get(handlers::workspaces::get_workspace)
                .put(handlers::workspaces::update_workspace)
                .delete(handlers::workspaces::delete_workspace),
        )
        .route(
            "/:id/members",
            get(handlers::workspace_members::list_members)
                .post(handlers::workspace_members::add_member),
        )
        .route(
            "/:id/members/:user_id",
            put(handlers::workspace_members::update_member_role)
                .delete(handlers::workspace_members::remove_member),
        );

    let project_routes = Router::new()
        .route(
            "/",
            post(handlers::projects::create_project).get(handlers::projects::list_projects),
        )
        .route(
            "/:id",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/:id/members",
            get(handlers::project_members::list_members)
                .post(handlers::project_members::add_member),
        )
        .route(
            "/:id/members/:user_id",
            put(handlers::project_members::update_member_role)
                .delete(handlers::project_members::remove_member),
        )
        .route(
            "/:id/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/:id/tasks/:task_id",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        )
        .route(
            "/:id/tasks/:task_id/status",
            patch(handlers::tasks::update_task_status),
        )
        .route(
            "/:id/tasks/:task_id/comments",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/:id/tasks/:task_id/comments/:comment_id",
            put(handlers::comments::update_comment).delete(handlers::comments::delete_comment),
        );

    let admin_routes = Router::new()
        .route("/kpis", get(handlers::admin::kpis))
        .route("/tasks-by-status", get(handlers::admin::tasks_by_status))
        .route(
            "/tasks-per-project",
            get(handlers::admin::tasks_per_project),
        )
        .route("/active-users", get(handlers::admin::active_users))
        .route("/users", get(handlers::admin::list_users))
        .route("/users/:id", patch(handlers::admin::update_user_details))
        .route(
            "/users/:id/status",
            patch(handlers::admin::update_user_status),
        )
        .route(
            "/users/:id/password",
            patch(handlers::admin::update_user_password),
        )
        .layer(middleware::from_fn(admin_only_middleware));

    let activity_routes = Router::new()
        .route("/", get(handlers::activity_log::list_activity_log))
        .layer(middleware::from_fn(admin_only_middleware));

    let protected = Router::new()
        .nest("/workspaces", workspace_routes)
        .nest("/projects", project_routes)
        .nest("/admin", admin_routes)
        .nest("/activity-log", activity_routes)
        .route("/stats/me", get(handlers::stats::my_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new().nest("/auth", auth_routes).merge(protected);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
