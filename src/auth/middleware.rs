//! Bearer-token request authentication.
//!
//! Runs once per request before routing. It only ever populates the
//! request's `SecurityContext`; it never rejects. Whether an empty context is
//! acceptable is the gate's decision.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use tracing::{debug, error, warn};

use super::context::SecurityContext;
use super::types::Identity;
use crate::directory::UserDirectory;
use crate::jwt::TokenService;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Token from an `Authorization: Bearer <token>` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
}

impl RequestAuthenticator {
    pub fn new(tokens: Arc<TokenService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { tokens, directory }
    }

    /// Bind the bearer token's identity into `ctx` when everything checks out.
    /// Every failure leaves `ctx` as it was.
    pub async fn authenticate(&self, headers: &HeaderMap, ctx: &mut SecurityContext) {
        let Some(token) = bearer_token(headers) else {
            debug!("No bearer token on request");
            return;
        };

        let resolved = AssertUnwindSafe(self.resolve(token, ctx.is_authenticated()))
            .catch_unwind()
            .await;

        match resolved {
            Ok(Some(identity)) => {
                let user_id = identity.id;
                match ctx.bind(identity) {
                    Ok(()) => debug!(user_id, "Request authenticated"),
                    Err(e) => warn!(user_id, error = %e, "Security context bound twice"),
                }
            }
            Ok(None) => {}
            Err(_) => error!("Panic while authenticating request; continuing unauthenticated"),
        }
    }

    async fn resolve(&self, token: &str, already_bound: bool) -> Option<Arc<Identity>> {
        let subject = match self.tokens.extract_subject(token) {
            Ok(subject) => subject,
            Err(e) => {
                debug!(reason = %e, "Unreadable bearer token");
                return None;
            }
        };

        if already_bound {
            debug!("Security context already populated; skipping");
            return None;
        }

        let identity = match self.directory.find_by_subject(&subject).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                debug!("Bearer token subject not in directory");
                return None;
            }
            Err(e) => {
                error!(error = %e, "Directory lookup failed during authentication");
                return None;
            }
        };

        if !self.tokens.verify(token) {
            warn!(user_id = identity.id, "Invalid bearer token for user");
            return None;
        }

        if !identity.is_active() {
            warn!(
                user_id = identity.id,
                enabled = identity.enabled,
                locked = identity.locked,
                "Valid token presented for inactive account"
            );
            return None;
        }

        Some(Arc::new(identity))
    }
}

/// Axum middleware wrapping `RequestAuthenticator::authenticate`.
pub async fn authenticate_request(
    State(authenticator): State<RequestAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut ctx = request
        .extensions_mut()
        .remove::<SecurityContext>()
        .unwrap_or_default();

    authenticator.authenticate(request.headers(), &mut ctx).await;

    request.extensions_mut().insert(ctx);
    next.run(request).await
}
