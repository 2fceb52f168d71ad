use thiserror::Error;

/// Why a token was rejected.
///
/// `TokenService::verify` collapses all of these to `false`; introspection and
/// logging keep the distinct cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature does not match")]
    SignatureMismatch,
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Rejected token configuration at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenConfigError {
    #[error("signing secret must be at least {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },
    #[error("token TTL must be at least {min} ms, got {actual}")]
    TtlTooShort { min: i64, actual: i64 },
    #[error("token TTL must be at most {max} ms, got {actual}")]
    TtlTooLong { max: i64, actual: i64 },
    #[error("token TTL must be a whole number of seconds, got {actual} ms")]
    TtlNotWholeSeconds { actual: i64 },
}
