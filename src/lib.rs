pub mod api;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod credentials;
pub mod db;
pub mod directory;
pub mod introspect;
pub mod jwt;
pub mod rate_limit;

use api::create_api_router;
use auth::{AuthenticationEngine, AuthorizationGate, RequestAuthenticator};
use axum::http::{HeaderValue, Method, header};
use axum::{Router, middleware};
use clock::Clock;
use credentials::{CredentialError, CredentialVerifier};
use db::Database;
use directory::UserDirectory;
use jwt::{TokenConfigError, TokenService};
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing bearer tokens
    pub jwt_secret: Vec<u8>,
    /// Token lifetime in milliseconds
    pub token_ttl_ms: i64,
    /// Time source for token issuance and checks
    pub clock: Arc<dyn Clock>,
    /// Password hashing
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Browser origin allowed by CORS; `None` disables the CORS layer
    pub cors_origin: Option<HeaderValue>,
    /// Per-IP limits on login and signup
    pub rate_limits: RateLimitConfig,
}

/// Configuration that cannot produce a working app.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Token(#[from] TokenConfigError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create the application router with the given configuration.
///
/// Layer order, outermost first: CORS, the request clock, request
/// authentication, the authorization gate, then the routes.
pub fn create_app(config: &ServerConfig) -> Result<Router, StartupError> {
    let tokens = Arc::new(TokenService::new(
        &config.jwt_secret,
        config.token_ttl_ms,
        config.clock.clone(),
    )?);
    let directory: Arc<dyn UserDirectory> = Arc::new(config.db.clone());
    let engine = AuthenticationEngine::new(directory.clone(), config.verifier.clone())?;

    let api_router = create_api_router(
        engine,
        tokens.clone(),
        directory.clone(),
        Arc::new(config.rate_limits.clone()),
    );

    let authenticator = RequestAuthenticator::new(tokens, directory);

    let app = Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn_with_state(
            AuthorizationGate::standard(),
            auth::authorize,
        ))
        .layer(middleware::from_fn_with_state(
            authenticator,
            auth::authenticate_request,
        ))
        .layer(middleware::from_fn_with_state(
            config.clock.clone(),
            clock::with_request_clock,
        ));

    Ok(match config.cors_origin.clone() {
        Some(origin) => app.layer(cors_layer(origin)),
        None => app,
    })
}

/// Serve `app` on the given listener until the server exits.
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), std::io::Error> {
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
