use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MemberRole;

/// Members are invited by email, not by id.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub member_email: String,
    #[serde(default = "default_role")]
    pub role: MemberRole,
}

fn default_role() -> MemberRole {
    MemberRole::Member
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

/// Adding an existing member is a silent no-op at the store; the response
/// tells the caller which of the two happened.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberResponse {
    pub user_id: Uuid,
    pub role: MemberRole,
    pub already_member: bool,
}
