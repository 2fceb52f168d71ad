//! Token issuance and verification.

use std::sync::Arc;

use super::{Claims, ClaimsCodec, TokenConfigError, TokenError};
use crate::auth::Identity;
use crate::clock::Clock;

/// Shortest accepted signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Shortest accepted token lifetime. Token timestamps have one-second
/// resolution, so anything shorter could produce `exp == iat`.
pub const MIN_TTL_MS: i64 = 1000;
/// One year.
pub const MAX_TTL_MS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Token claims carry whole seconds, so the lifetime must too.
pub fn check_ttl(ttl_ms: i64) -> Result<(), TokenConfigError> {
    if ttl_ms < MIN_TTL_MS {
        return Err(TokenConfigError::TtlTooShort {
            min: MIN_TTL_MS,
            actual: ttl_ms,
        });
    }
    if ttl_ms > MAX_TTL_MS {
        return Err(TokenConfigError::TtlTooLong {
            max: MAX_TTL_MS,
            actual: ttl_ms,
        });
    }
    if ttl_ms % 1000 != 0 {
        return Err(TokenConfigError::TtlNotWholeSeconds { actual: ttl_ms });
    }
    Ok(())
}

/// Result of issuing a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The compact JWS string
    pub token: String,
    /// Issued at (Unix milliseconds)
    pub issued_at_ms: i64,
    /// Expiration (Unix milliseconds)
    pub expires_at_ms: i64,
    /// Lifetime in milliseconds
    pub expires_in_ms: i64,
}

/// Issues and checks bearer tokens. Pure over (payload, secret, clock); safe to
/// share across any number of concurrent requests.
#[derive(Clone)]
pub struct TokenService {
    codec: ClaimsCodec,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        secret: &[u8],
        ttl_ms: i64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenConfigError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(TokenConfigError::SecretTooShort {
                min: MIN_SECRET_LENGTH,
                actual: secret.len(),
            });
        }
        check_ttl(ttl_ms)?;

        Ok(Self {
            codec: ClaimsCodec::new(secret),
            ttl_ms,
            clock,
        })
    }

    /// Token lifetime in milliseconds.
    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Issue a token for an authenticated identity.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        let iat = self.clock.now_ms().div_euclid(1000);
        let exp = iat
            .checked_add(self.ttl_ms / 1000)
            .ok_or_else(|| TokenError::Signing("expiry out of range".into()))?;

        let claims = Claims {
            sub: identity.subject.clone(),
            iat,
            exp,
        };
        let token = self.codec.encode(&claims)?;

        Ok(IssuedToken {
            token,
            issued_at_ms: claims.issued_at_ms(),
            expires_at_ms: claims.expires_at_ms(),
            expires_in_ms: self.ttl_ms,
        })
    }

    /// Full check: signature, then expiry.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, self.clock.now_ms())
    }

    /// `validate` against a caller-supplied instant (Unix ms).
    pub fn validate_at(&self, token: &str, now_ms: i64) -> Result<Claims, TokenError> {
        let claims = self.codec.decode_verified(token)?;
        if claims.is_expired_at(now_ms) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// `true` only for a well-formed, correctly signed, unexpired token.
    pub fn verify(&self, token: &str) -> bool {
        match self.validate(token) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(reason = %e, "Token rejected");
                false
            }
        }
    }

    /// Read the subject without checking the signature.
    ///
    /// The result identifies a candidate identity only; it must not be trusted
    /// until `verify` has accepted the same token.
    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        let claims = ClaimsCodec::decode_unverified(token)?;
        if claims.sub.trim().is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(claims.sub)
    }

    /// Expiration instant (Unix ms) of a correctly signed token, expired or not.
    pub fn expiration_of(&self, token: &str) -> Result<i64, TokenError> {
        self.codec
            .decode_verified(token)
            .map(|claims| claims.expires_at_ms())
    }

    /// Issued-at instant (Unix ms) of a correctly signed token, expired or not.
    pub fn issued_at_of(&self, token: &str) -> Result<i64, TokenError> {
        self.codec
            .decode_verified(token)
            .map(|claims| claims.issued_at_ms())
    }
}
