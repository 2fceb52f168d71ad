mod admin;
mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthenticationEngine;
use crate::directory::UserDirectory;
use crate::introspect::TokenIntrospector;
use crate::jwt::TokenService;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ErrorBody, ResultExt};

/// Create the API router.
pub fn create_api_router(
    engine: AuthenticationEngine,
    tokens: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = auth::AuthState {
        engine,
        tokens: tokens.clone(),
        rate_limit_config,
    };

    let users_state = users::UsersState {
        introspector: TokenIntrospector::new(tokens, directory.clone()),
    };

    let admin_state = admin::AdminState { directory };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/admin", admin::router(admin_state))
        .merge(users::router(users_state))
}
