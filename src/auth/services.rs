use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthUserResponse, LoginRequest, RegisterRequest, UpdateUserRequest},
        errors::{AuthError, FieldErrors, BLANK, TAKEN},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, User, UserChanges},
    },
    state::AppState,
};

/// Account operations: sign-up, login, current user, profile update.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
    bcrypt_cost: u32,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            JwtKeys::from_ref(state),
            state.config.bcrypt_cost,
        )
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// One `can't be blank` entry per blank field.
fn require_present(fields: &[(&str, &str)]) -> Result<(), AuthError> {
    let mut errors = FieldErrors::new();
    for (name, value) in fields {
        if is_blank(value) {
            errors.add(name, BLANK);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

/// Drops blank strings so they leave the column untouched.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_blank(v))
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys, bcrypt_cost: u32) -> Self {
        Self {
            users,
            keys,
            bcrypt_cost,
        }
    }

    pub async fn create_user(&self, input: RegisterRequest) -> Result<AuthUserResponse, AuthError> {
        require_present(&[
            ("username", input.username.as_str()),
            ("email", input.email.as_str()),
            ("password", input.password.as_str()),
        ])?;

        let email = trimmed(&input.email);
        let username = trimmed(&input.username);
        self.check_unique(&email, &username).await?;

        let password = self.hash(input.password).await?;
        let user = self
            .users
            .create(NewUser {
                username,
                email,
                password,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "user registered");
        self.respond(user)
    }

    pub async fn login(&self, input: LoginRequest) -> Result<AuthUserResponse, AuthError> {
        require_present(&[
            ("email", input.email.as_str()),
            ("password", input.password.as_str()),
        ])?;

        let email = trimmed(&input.email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let hash = user.password.clone();
        let plain = input.password;
        let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
            .await
            .context("bcrypt verify task")??;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        self.respond(user)
    }

    pub async fn get_current_user(&self, id: i32) -> Result<AuthUserResponse, AuthError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.respond(user)
    }

    pub async fn update_user(
        &self,
        input: UpdateUserRequest,
        id: i32,
    ) -> Result<AuthUserResponse, AuthError> {
        let password = match non_blank(input.password) {
            Some(plain) => Some(self.hash(plain).await?),
            None => None,
        };
        let changes = UserChanges {
            username: non_blank(input.username).map(|u| trimmed(&u)),
            email: non_blank(input.email).map(|e| trimmed(&e)),
            password,
            bio: input.bio,
            image: input.image,
        };

        let user = match self.users.update(id, changes).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AuthError::UserNotFound),
            Err(e) => {
                warn!(user_id = id, error = %e, "update rejected");
                return Err(e.into());
            }
        };

        info!(user_id = user.id, "user updated");
        self.respond(user)
    }

    async fn check_unique(&self, email: &str, username: &str) -> Result<(), AuthError> {
        let mut errors = FieldErrors::new();
        if self.users.find_by_email(email).await?.is_some() {
            errors.add("email", TAKEN);
        }
        if self.users.find_by_username(username).await?.is_some() {
            errors.add("username", TAKEN);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            warn!(email = %email, username = %username, "sign-up conflict");
            Err(AuthError::Conflict(errors))
        }
    }

    async fn hash(&self, plain: String) -> Result<String, AuthError> {
        let cost = self.bcrypt_cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost))
            .await
            .context("bcrypt hash task")??;
        Ok(hash)
    }

    fn respond(&self, user: User) -> Result<AuthUserResponse, AuthError> {
        let token = self.keys.sign(user.id)?;
        Ok(AuthUserResponse::new(user, token))
    }
}
