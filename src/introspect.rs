//! Token introspection for the `validate-token` endpoint.
//!
//! Answers "is this token good right now, and for whom" without touching any
//! security context.

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{debug, error};

use crate::auth::{BEARER_PREFIX, UserProfile};
use crate::directory::UserDirectory;
use crate::jwt::{TokenError, TokenService};

pub const TOKEN_TYPE: &str = "Bearer";

/// Wire format of introspection timestamps, e.g. `2026-10-19T08:00:00.000+0000`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

pub fn format_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn timestamp<S: Serializer>(ms: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(*ms))
}

fn optional_timestamp<S: Serializer>(ms: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    match ms {
        Some(ms) => timestamp(ms, serializer),
        None => serializer.serialize_none(),
    }
}

/// Why introspection did not accept a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionError {
    MissingHeader,
    Malformed,
    InvalidSignature,
    Expired,
    UserNotFound,
    UserDisabled,
    UserLocked,
    ValidationError,
}

impl IntrospectionError {
    pub fn code(&self) -> &'static str {
        match self {
            IntrospectionError::MissingHeader => "MISSING_HEADER",
            IntrospectionError::Malformed => "MALFORMED",
            IntrospectionError::InvalidSignature => "INVALID_SIGNATURE",
            IntrospectionError::Expired => "EXPIRED",
            IntrospectionError::UserNotFound => "USER_NOT_FOUND",
            IntrospectionError::UserDisabled => "USER_DISABLED",
            IntrospectionError::UserLocked => "USER_LOCKED",
            IntrospectionError::ValidationError => "VALIDATION_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            IntrospectionError::MissingHeader => "Authorization header is missing",
            IntrospectionError::Malformed
            | IntrospectionError::InvalidSignature
            | IntrospectionError::Expired => "Token is invalid or expired",
            IntrospectionError::UserNotFound => "User not found",
            IntrospectionError::UserDisabled => "User account is disabled",
            IntrospectionError::UserLocked => "User account is locked",
            IntrospectionError::ValidationError => "Token validation error",
        }
    }
}

/// Result of one introspection call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_timestamp"
    )]
    pub expires_at: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "optional_timestamp"
    )]
    pub issued_at: Option<i64>,
    #[serde(serialize_with = "timestamp")]
    pub validated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl ValidationOutcome {
    fn rejected(error: IntrospectionError, now_ms: i64) -> Self {
        Self {
            is_valid: false,
            message: error.message(),
            user: None,
            expires_at: None,
            issued_at: None,
            validated_at: now_ms,
            token_type: None,
            remaining_time_ms: None,
            error_code: Some(error.code()),
        }
    }

    /// HTTP status: 200 valid, 400 missing header, 401 anything else.
    pub fn status(&self) -> StatusCode {
        if self.is_valid {
            StatusCode::OK
        } else if self.error_code == Some(IntrospectionError::MissingHeader.code()) {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::UNAUTHORIZED
        }
    }
}

#[derive(Clone)]
pub struct TokenIntrospector {
    tokens: Arc<TokenService>,
    directory: Arc<dyn UserDirectory>,
}

impl TokenIntrospector {
    pub fn new(tokens: Arc<TokenService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { tokens, directory }
    }

    /// Inspect a raw `Authorization` header value. The `Bearer ` prefix is
    /// optional; a blank value counts as missing.
    pub async fn introspect(&self, header: Option<&str>) -> ValidationOutcome {
        let now_ms = self.tokens.now_ms();

        let token = match header.map(str::trim) {
            None | Some("") => {
                return ValidationOutcome::rejected(IntrospectionError::MissingHeader, now_ms);
            }
            Some(value) => value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim(),
        };

        let claims = match self.tokens.validate_at(token, now_ms) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(reason = %e, "Introspected token rejected");
                let error = match e {
                    TokenError::Expired => IntrospectionError::Expired,
                    TokenError::SignatureMismatch => IntrospectionError::InvalidSignature,
                    TokenError::Malformed | TokenError::Signing(_) => IntrospectionError::Malformed,
                };
                return ValidationOutcome::rejected(error, now_ms);
            }
        };

        let identity = match self.directory.find_by_subject(&claims.sub).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                return ValidationOutcome::rejected(IntrospectionError::UserNotFound, now_ms);
            }
            Err(e) => {
                error!(error = %e, "Directory lookup failed during introspection");
                return ValidationOutcome::rejected(IntrospectionError::ValidationError, now_ms);
            }
        };

        if !identity.enabled {
            return ValidationOutcome::rejected(IntrospectionError::UserDisabled, now_ms);
        }
        if identity.locked {
            return ValidationOutcome::rejected(IntrospectionError::UserLocked, now_ms);
        }

        let expires_at = claims.expires_at_ms();
        ValidationOutcome {
            is_valid: true,
            message: "Token is valid",
            user: Some(UserProfile::from(&identity)),
            expires_at: Some(expires_at),
            issued_at: Some(claims.issued_at_ms()),
            validated_at: now_ms,
            token_type: Some(TOKEN_TYPE),
            remaining_time_ms: Some(expires_at - now_ms),
            error_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Identity, Role};
    use crate::clock::ManualClock;
    use crate::db::Database;
    use crate::directory::NewIdentity;

    const SECRET: &[u8] = b"introspection-test-secret-0123456789";
    const T0: i64 = 1_760_000_000_000;
    const HOUR_MS: i64 = 3_600_000;

    struct Fixture {
        introspector: TokenIntrospector,
        tokens: Arc<TokenService>,
        clock: ManualClock,
        db: Database,
        identity: Identity,
    }

    async fn fixture() -> Fixture {
        let db = Database::open(":memory:").await.unwrap();
        db.users()
            .create(&NewIdentity {
                email: "leo@example.com".into(),
                username: "leo".into(),
                first_name: Some("Leo".into()),
                last_name: Some("Tolstoy".into()),
                password_hash: "$argon2id$stub".into(),
                role: Role::User,
                enabled: true,
            })
            .await
            .unwrap();
        let identity = db.users().get_by_email("leo@example.com").await.unwrap().unwrap();

        let clock = ManualClock::new(T0);
        let tokens = Arc::new(TokenService::new(SECRET, HOUR_MS, Arc::new(clock.clone())).unwrap());
        let introspector = TokenIntrospector::new(tokens.clone(), Arc::new(db.clone()));
        Fixture {
            introspector,
            tokens,
            clock,
            db,
            identity,
        }
    }

    #[tokio::test]
    async fn test_missing_header() {
        let f = fixture().await;
        for header in [None, Some(""), Some("   ")] {
            let outcome = f.introspector.introspect(header).await;
            assert!(!outcome.is_valid);
            assert_eq!(outcome.message, "Authorization header is missing");
            assert_eq!(outcome.error_code, Some("MISSING_HEADER"));
            assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_lifetime_scenario() {
        let f = fixture().await;
        let token = f.tokens.issue(&f.identity).unwrap().token;
        let header = format!("Bearer {}", token);

        f.clock.set(T0 + 1000);
        let outcome = f.introspector.introspect(Some(&header)).await;
        assert!(outcome.is_valid);
        assert_eq!(outcome.message, "Token is valid");
        assert_eq!(outcome.remaining_time_ms, Some(3_599_000));
        assert_eq!(outcome.expires_at, Some(T0 + HOUR_MS));
        assert_eq!(outcome.issued_at, Some(T0));
        assert_eq!(outcome.token_type, Some("Bearer"));
        assert_eq!(outcome.user.as_ref().unwrap().email, "leo@example.com");
        assert_eq!(outcome.status(), StatusCode::OK);

        f.clock.set(T0 + 3_600_001);
        let outcome = f.introspector.introspect(Some(&header)).await;
        assert!(!outcome.is_valid);
        assert_eq!(outcome.error_code, Some("EXPIRED"));
        assert_eq!(outcome.message, "Token is invalid or expired");
        assert_eq!(outcome.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_prefix_is_optional() {
        let f = fixture().await;
        let token = f.tokens.issue(&f.identity).unwrap().token;
        assert!(f.introspector.introspect(Some(&token)).await.is_valid);
    }

    #[tokio::test]
    async fn test_bad_tokens_carry_distinct_codes() {
        let f = fixture().await;
        let outcome = f.introspector.introspect(Some("Bearer not.a.jwt")).await;
        assert_eq!(outcome.error_code, Some("MALFORMED"));

        let other = TokenService::new(
            b"some-other-secret-entirely-0123456789",
            HOUR_MS,
            Arc::new(f.clock.clone()),
        )
        .unwrap();
        let forged = other.issue(&f.identity).unwrap().token;
        let outcome = f
            .introspector
            .introspect(Some(&format!("Bearer {}", forged)))
            .await;
        assert_eq!(outcome.error_code, Some("INVALID_SIGNATURE"));
        assert!(outcome.user.is_none());
    }

    #[tokio::test]
    async fn test_account_state_is_rechecked() {
        let f = fixture().await;
        let token = f.tokens.issue(&f.identity).unwrap().token;

        f.db.users().set_enabled("leo@example.com", false).await.unwrap();
        let outcome = f.introspector.introspect(Some(&token)).await;
        assert!(!outcome.is_valid);
        assert_eq!(outcome.message, "User account is disabled");
        assert_eq!(outcome.error_code, Some("USER_DISABLED"));

        f.db.users().set_enabled("leo@example.com", true).await.unwrap();
        f.db.users().set_locked("leo@example.com", true).await.unwrap();
        let outcome = f.introspector.introspect(Some(&token)).await;
        assert_eq!(outcome.error_code, Some("USER_LOCKED"));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let f = fixture().await;
        let mut ghost = f.identity.clone();
        ghost.subject = "ghost@example.com".into();
        let token = f.tokens.issue(&ghost).unwrap().token;

        let outcome = f.introspector.introspect(Some(&token)).await;
        assert_eq!(outcome.message, "User not found");
        assert_eq!(outcome.error_code, Some("USER_NOT_FOUND"));
    }

    #[tokio::test]
    async fn test_json_shape() {
        let f = fixture().await;
        let token = f.tokens.issue(&f.identity).unwrap().token;

        let json = serde_json::to_value(f.introspector.introspect(Some(&token)).await).unwrap();
        assert_eq!(json["isValid"], true);
        assert_eq!(json["tokenType"], "Bearer");
        assert_eq!(json["remainingTimeMs"], HOUR_MS);
        assert_eq!(json["issuedAt"], format_timestamp(T0));
        assert!(json.get("errorCode").is_none());

        let json = serde_json::to_value(f.introspector.introspect(None).await).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["errorCode"], "MISSING_HEADER");
        assert!(json.get("user").is_none());
        assert!(json.get("expiresAt").is_none());
        assert!(json["validatedAt"].is_string());
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000+0000");
        assert_eq!(format_timestamp(1_500), "1970-01-01T00:00:01.500+0000");
    }
}
