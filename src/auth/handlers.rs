use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthUserResponse, LoginRequest, RegisterRequest, UpdateUserRequest, UserEnvelope},
        errors::AuthError,
        extractors::AuthUser,
        services::AuthService,
    },
    state::AppState,
};

type UserResult = Result<Json<UserEnvelope<AuthUserResponse>>, AuthError>;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_me).put(update_me))
}

fn envelope(user: AuthUserResponse) -> Json<UserEnvelope<AuthUserResponse>> {
    Json(UserEnvelope { user })
}

#[instrument(skip(service, payload))]
pub async fn register(
    State(service): State<AuthService>,
    Json(payload): Json<UserEnvelope<RegisterRequest>>,
) -> UserResult {
    service.create_user(payload.user).await.map(envelope)
}

#[instrument(skip(service, payload))]
pub async fn login(
    State(service): State<AuthService>,
    Json(payload): Json<UserEnvelope<LoginRequest>>,
) -> UserResult {
    service.login(payload.user).await.map(envelope)
}

#[instrument(skip(service))]
pub async fn get_me(State(service): State<AuthService>, AuthUser(user_id): AuthUser) -> UserResult {
    service.get_current_user(user_id).await.map(envelope)
}

#[instrument(skip(service, payload))]
pub async fn update_me(
    State(service): State<AuthService>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UserEnvelope<UpdateUserRequest>>,
) -> UserResult {
    service.update_user(payload.user, user_id).await.map(envelope)
}
