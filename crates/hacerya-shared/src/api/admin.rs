use serde::{Deserialize, Serialize};

use crate::models::{AccountStatus, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub account_status: AccountStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserDetailsRequest {
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateUserPasswordRequest {
    pub password: String,
}
