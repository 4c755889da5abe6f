pub mod activity_log;
pub mod admin;
pub mod auth;
pub mod comments;
pub mod project_members;
pub mod projects;
pub mod stats;
pub mod tasks;
pub mod workspace_members;
pub mod workspaces;
