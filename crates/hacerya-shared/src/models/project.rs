use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MemberRole;

/// Unit of work inside a workspace, or a personal workspace-less project
/// (`workspace_id` is NULL and `is_personal` is true).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<Uuid>,
    pub created_by: Uuid,
    pub is_personal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing shape: the project plus the caller's membership role, if any.
/// Creators of personal projects have no row, so the role is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithRole {
    #[serde(flatten)]
    pub project: Project,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user_role: Option<MemberRole>,
}
