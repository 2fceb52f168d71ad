//! Profile and token introspection endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::{Principal, UserProfile};
use crate::introspect::TokenIntrospector;

#[derive(Clone)]
pub struct UsersState {
    pub introspector: TokenIntrospector,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/profile", get(profile))
        .route("/validate-token", post(validate_token))
        .with_state(state)
}

/// Profile of the authenticated caller.
async fn profile(Principal(identity): Principal) -> impl IntoResponse {
    Json(UserProfile::from(identity.as_ref()))
}

/// Report whether the bearer token in `Authorization` is currently valid.
async fn validate_token(State(state): State<UsersState>, headers: HeaderMap) -> impl IntoResponse {
    let header = headers
        .get(header::AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let outcome = state.introspector.introspect(header.as_deref()).await;
    (outcome.status(), Json(outcome))
}
