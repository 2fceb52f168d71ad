#![allow(dead_code)]

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderValue, Request, Response, header},
};
use serde_json::Value;
use tollgate::{
    ServerConfig, clock::ManualClock, create_app, credentials::Argon2Verifier, db::Database,
    rate_limit::RateLimitConfig,
};
use tower::ServiceExt;

pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const T0: i64 = 1_760_000_000_000;
pub const TTL_MS: i64 = 3_600_000;
pub const ORIGIN: &str = "http://localhost:8081";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub clock: ManualClock,
}

pub fn generous_limits() -> RateLimitConfig {
    let many = NonZeroU32::new(1000).unwrap();
    RateLimitConfig::new(many, many, many)
}

pub async fn test_config(rate_limits: RateLimitConfig) -> (ServerConfig, ManualClock) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let clock = ManualClock::new(T0);
    let config = ServerConfig {
        db,
        jwt_secret: SECRET.to_vec(),
        token_ttl_ms: TTL_MS,
        clock: Arc::new(clock.clone()),
        verifier: Arc::new(Argon2Verifier::with_cost(8, 1, 1).unwrap()),
        cors_origin: Some(HeaderValue::from_static(ORIGIN)),
        rate_limits,
    };
    (config, clock)
}

pub async fn create_test_app_with(rate_limits: RateLimitConfig) -> TestApp {
    let (config, clock) = test_config(rate_limits).await;
    let app = create_app(&config).expect("Failed to build app");
    TestApp {
        app,
        db: config.db.clone(),
        clock,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(generous_limits()).await
}

fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50000)))
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(peer())
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri).extension(peer());
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn validate_token_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/validate-token")
        .extension(peer());
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn signup_body(email: &str, username: &str, password: &str, role: Option<&str>) -> Value {
    let mut body = serde_json::json!({
        "firstName": "Test",
        "lastName": "User",
        "username": username,
        "email": email,
        "password": password,
    });
    if let Some(role) = role {
        body["role"] = Value::from(role);
    }
    body
}

impl TestApp {
    /// Register through the API, enable the account, log in, return the token.
    pub async fn enabled_user_token(
        &self,
        email: &str,
        username: &str,
        role: Option<&str>,
    ) -> String {
        let response = send(
            &self.app,
            post_json(
                "/api/auth/signup",
                signup_body(email, username, "s3cret-pass", role),
            ),
        )
        .await;
        assert_eq!(response.status(), 200, "signup failed for {}", email);

        assert!(self.db.users().set_enabled(email, true).await.unwrap());
        self.login(email, "s3cret-pass").await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = send(
            &self.app,
            post_json(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            ),
        )
        .await;
        assert_eq!(response.status(), 200, "login failed for {}", email);
        body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}
