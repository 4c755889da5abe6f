use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-entity role held through an explicit membership row. The creator of a
/// workspace/project never appears here; ownership is derived separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "member_role", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// A membership row joined with the user's profile, as returned by the
/// member-listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: MemberRole,
}
