//! Bearer-token authentication with role-based access control.
//!
//! `RequestAuthenticator` binds a principal into each request's
//! `SecurityContext`; `AuthorizationGate` then admits or refuses the request
//! by path. Login and registration live in `AuthenticationEngine`.

mod context;
mod engine;
mod entry_point;
mod errors;
mod extractors;
mod gate;
mod middleware;
mod types;

pub use context::{AlreadyBound, SecurityContext};
pub use engine::{AuthenticationEngine, RegistrationRequest};
pub use entry_point::{AuthenticationEntryPoint, Rejection};
pub use errors::AuthError;
pub use extractors::{Principal, PrincipalRejection};
pub use gate::{Access, AuthorizationGate, authorize};
pub use middleware::{BEARER_PREFIX, RequestAuthenticator, authenticate_request, bearer_token};
pub use types::{Identity, Permission, Role, UserProfile};
