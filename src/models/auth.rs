use serde::{Deserialize, Serialize};

use crate::secrets::Secret;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Signed in with an API key: read-only access to tasks and characters.
    Viewer,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PasswordLogin<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiKeyLogin<'a> {
    pub api_key: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: Secret,
    #[serde(default = "admin_role")]
    pub role: Role,
}

fn admin_role() -> Role {
    Role::Admin
}

/// `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub username: String,
    pub role: Role,
}
