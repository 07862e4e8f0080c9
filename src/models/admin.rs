//! Admin login types

use serde::{Deserialize, Serialize};

/// Login form: all three factors must match the configured values
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub keyword: String,
}

/// Authenticated admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub email: String,
    pub authenticated: bool,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: AdminUser,
    /// Opaque session token for `Authorization: Bearer`
    pub token: String,
}
