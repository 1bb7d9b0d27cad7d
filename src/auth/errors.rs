//! Errors surfaced by the auth service, rendered as
//! `{"errors": {"<field>": ["<message>", ...]}}`.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::auth::repo::StoreError;

pub const BLANK: &str = "can't be blank";
pub const TAKEN: &str = "has already been taken";

/// Field name to list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub errors: FieldErrors,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("conflict: {0}")]
    Conflict(FieldErrors),

    #[error("email or password is invalid")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("token is missing or invalid")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AuthError::InvalidCredentials => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `errors` map sent to the client.
    pub fn errors(&self) -> FieldErrors {
        match self {
            AuthError::Validation(errors) | AuthError::Conflict(errors) => errors.clone(),
            AuthError::InvalidCredentials => FieldErrors::single("email or password", "is invalid"),
            AuthError::UserNotFound => FieldErrors::single("user", "not found"),
            AuthError::Unauthorized => FieldErrors::single("token", "is missing or invalid"),
            AuthError::Internal(_) => FieldErrors::single("server", "internal error"),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => AuthError::Conflict(FieldErrors::single(field, TAKEN)),
            StoreError::Database(e) => AuthError::Internal(anyhow::Error::new(e).context("user store")),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(e) = &self {
            error!(error = ?e, "request failed");
        }
        let status = self.status();
        (status, Json(ErrorBody { errors: self.errors() })).into_response()
    }
}
