//! Per-request security context.

use std::sync::Arc;

use thiserror::Error;

use super::types::{Identity, Permission};

#[derive(Debug, Error)]
#[error("security context already holds a principal")]
pub struct AlreadyBound;

/// Holder of the authenticated principal for one request.
///
/// Lives in the request's extensions: created empty by the authenticator,
/// bound at most once, read by the gate and handlers, dropped with the request.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Arc<Identity>>,
}

impl SecurityContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<&Arc<Identity>> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.principal
            .as_ref()
            .is_some_and(|identity| identity.has_permission(permission))
    }

    /// Bind the principal. Fails if one is already bound.
    pub fn bind(&mut self, identity: Arc<Identity>) -> Result<(), AlreadyBound> {
        if self.principal.is_some() {
            return Err(AlreadyBound);
        }
        self.principal = Some(identity);
        Ok(())
    }
}
