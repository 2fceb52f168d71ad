//! Path-based access rules.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::context::SecurityContext;
use super::entry_point::{AuthenticationEntryPoint, Rejection};
use super::types::Permission;

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Permission(Permission),
}

#[derive(Debug, Clone)]
struct RouteRule {
    pattern: String,
    access: Access,
}

impl RouteRule {
    /// `/a/b` matches exactly; `/a/**` matches `/a` and everything below it.
    fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix("/**") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => path == self.pattern,
        }
    }
}

/// Ordered rule list; the first matching rule decides.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    rules: Arc<Vec<RouteRule>>,
    fallback: Access,
}

impl AuthorizationGate {
    pub fn new(fallback: Access) -> Self {
        Self {
            rules: Arc::new(Vec::new()),
            fallback,
        }
    }

    /// Append a rule. Earlier rules win.
    pub fn rule(mut self, pattern: impl Into<String>, access: Access) -> Self {
        Arc::make_mut(&mut self.rules).push(RouteRule {
            pattern: pattern.into(),
            access,
        });
        self
    }

    /// Rules for the HTTP surface this crate serves.
    pub fn standard() -> Self {
        Self::new(Access::Authenticated)
            .rule("/api/auth/**", Access::Public)
            .rule("/api/validate-token", Access::Public)
            .rule("/api/profile", Access::Permission(Permission::ViewProfile))
            .rule("/api/admin/**", Access::Permission(Permission::ListUsers))
            .rule("/api/**", Access::Authenticated)
    }

    /// Access required for a request. Preflight requests are always public.
    pub fn access_for(&self, method: &Method, path: &str) -> Access {
        if *method == Method::OPTIONS {
            return Access::Public;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.access)
            .unwrap_or(self.fallback)
    }

    pub fn check(
        &self,
        method: &Method,
        path: &str,
        ctx: Option<&SecurityContext>,
    ) -> Result<(), Rejection> {
        let authenticated = ctx.is_some_and(SecurityContext::is_authenticated);
        match self.access_for(method, path) {
            Access::Public => Ok(()),
            Access::Authenticated if authenticated => Ok(()),
            Access::Permission(permission) if authenticated => {
                if ctx.is_some_and(|c| c.has_permission(permission)) {
                    Ok(())
                } else {
                    Err(Rejection::Forbidden)
                }
            }
            Access::Authenticated | Access::Permission(_) => Err(Rejection::Unauthenticated),
        }
    }
}

/// Axum middleware enforcing `AuthorizationGate`. Must run inside
/// `authenticate_request` so the context is populated.
pub async fn authorize(
    State(gate): State<AuthorizationGate>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = request.extensions().get::<SecurityContext>();
    match gate.check(request.method(), request.uri().path(), ctx) {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            debug!(path = %request.uri().path(), ?rejection, "Request rejected by gate");
            AuthenticationEntryPoint::commence(rejection, request.uri().path())
        }
    }
}
