mod admin;
mod auth;
mod comments;
mod members;
mod projects;
mod tasks;
mod workspaces;

pub use admin::*;
pub use auth::*;
pub use comments::*;
pub use members::*;
pub use projects::*;
pub use tasks::*;
pub use workspaces::*;
