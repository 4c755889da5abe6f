mod activity;
mod comment;
mod member;
mod project;
mod stats;
mod task;
mod user;
mod workspace;

pub use activity::*;
pub use comment::*;
pub use member::*;
pub use project::*;
pub use stats::*;
pub use task::*;
pub use user::*;
pub use workspace::*;
