mod jwt;
mod middleware;
mod password;

pub use jwt::{create_token, verify_token};
pub use middleware::{admin_only_middleware, auth_middleware, AuthUser};
pub use password::{hash_password, verify_password};
