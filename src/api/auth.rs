//! Signup and login endpoints. Both are public.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use crate::auth::{AuthenticationEngine, RegistrationRequest, UserProfile};
use crate::jwt::TokenService;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};

#[derive(Clone)]
pub struct AuthState {
    pub engine: AuthenticationEngine,
    pub tokens: Arc<TokenService>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: AuthState) -> Router {
    let signup_router = Router::new()
        .route("/signup", post(signup))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_signup,
        ));

    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config,
            rate_limit_login,
        ));

    Router::new().merge(signup_router).merge(login_router)
}

/// Map an unreadable JSON body to the shared error shape.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| ApiError::bad_request("Request body is missing or unreadable"))
}

async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let identity = state.engine.register_identity(request).await?;
    Ok(Json(UserProfile::from(&identity)))
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    /// Token lifetime in milliseconds
    expires_in: i64,
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let identity = state
        .engine
        .authenticate(request.email.trim(), &request.password)
        .await?;

    let issued = state.tokens.issue(&identity).map_err(|e| {
        tracing::error!(error = %e, "Failed to issue token");
        ApiError::internal("Failed to issue token")
    })?;

    info!(user_id = identity.id, "User logged in");
    Ok(Json(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in_ms,
    }))
}
