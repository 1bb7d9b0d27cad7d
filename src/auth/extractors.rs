use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::{errors::AuthError, jwt::JwtKeys};

/// Extracts and validates the JWT, returning the user ID.
///
/// Reads `Authorization: Token <jwt>`; the `Bearer` scheme is accepted too.
pub struct AuthUser(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::Unauthorized)?;

        let token = ["Token ", "Bearer ", "bearer "]
            .iter()
            .find_map(|scheme| auth.strip_prefix(*scheme))
            .ok_or(AuthError::Unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AuthError::Unauthorized
        })?;

        claims.user_id().map(AuthUser).ok_or(AuthError::Unauthorized)
    }
}
