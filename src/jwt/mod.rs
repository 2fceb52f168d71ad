//! Bearer token issuance and validation.
//!
//! Tokens are compact HS256 JWS strings carrying only the subject key and the
//! issued-at / expiry timestamps. Nothing about a token is stored server-side:
//! validity is a function of the payload, the process-wide secret and the clock.

mod codec;
mod error;
mod service;

pub use codec::{Claims, ClaimsCodec};
pub use error::{TokenConfigError, TokenError};
pub use service::{
    IssuedToken, MAX_TTL_MS, MIN_SECRET_LENGTH, MIN_TTL_MS, TokenService, check_ttl,
};
