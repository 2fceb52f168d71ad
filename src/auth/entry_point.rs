//! Responses for requests the gate turns away.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::ErrorBody;

/// Why a request was refused before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No principal bound
    Unauthenticated,
    /// Principal bound but lacks the required permission
    Forbidden,
}

pub struct AuthenticationEntryPoint;

impl AuthenticationEntryPoint {
    pub const UNAUTHENTICATED_MESSAGE: &'static str =
        "Full authentication is required to access this resource";
    pub const FORBIDDEN_MESSAGE: &'static str = "Access denied";

    /// Structured 401/403 for `path`.
    pub fn commence(rejection: Rejection, path: &str) -> Response {
        let (status, message) = match rejection {
            Rejection::Unauthenticated => (StatusCode::UNAUTHORIZED, Self::UNAUTHENTICATED_MESSAGE),
            Rejection::Forbidden => (StatusCode::FORBIDDEN, Self::FORBIDDEN_MESSAGE),
        };
        ErrorBody::new(status, message)
            .with_path(path)
            .into_response()
    }
}
