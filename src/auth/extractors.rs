//! Axum extractors for the authenticated principal.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

use super::context::SecurityContext;
use super::entry_point::{AuthenticationEntryPoint, Rejection};
use super::types::Identity;

/// Principal bound by the request authenticator. Rejects with 401 when the
/// request is anonymous.
#[derive(Debug, Clone)]
pub struct Principal(pub Arc<Identity>);

/// Rejection of `Principal`, rendered by the entry point.
#[derive(Debug)]
pub struct PrincipalRejection {
    path: String,
}

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> Response {
        AuthenticationEntryPoint::commence(Rejection::Unauthenticated, &self.path)
    }
}

fn bound_principal(parts: &Parts) -> Option<Arc<Identity>> {
    parts
        .extensions
        .get::<SecurityContext>()
        .and_then(SecurityContext::principal)
        .cloned()
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bound_principal(parts).map(Principal).ok_or_else(|| PrincipalRejection {
            path: parts.uri.path().to_string(),
        })
    }
}
