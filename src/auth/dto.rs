use serde::{Deserialize, Serialize};

use crate::auth::repo_types::User;

/// Conduit wraps every user payload as `{"user": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: T,
}

/// Request body for user registration. Missing fields count as blank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for a profile update. Only present fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// The user as returned to the client, with a freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUserResponse {
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub token: String,
}

impl AuthUserResponse {
    pub fn new(user: User, token: String) -> Self {
        Self {
            email: user.email,
            username: user.username,
            bio: user.bio,
            image: user.image,
            token,
        }
    }
}
