//! Login and registration.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use rand::RngCore;
use serde::Deserialize;
use tracing::{info, warn};

use super::errors::AuthError;
use super::types::{Identity, Role};
use crate::credentials::{CredentialError, CredentialVerifier};
use crate::directory::{NewIdentity, UniqueField, UserDirectory};

const EMAIL_MAX_LENGTH: usize = 50;
const USERNAME_MAX_LENGTH: usize = 20;

/// Self-registration input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Role name, e.g. `ROLE_ADMIN`. Defaults to `ROLE_USER`.
    #[serde(default)]
    pub role: Option<String>,
}

impl RegistrationRequest {
    /// Field-level checks. Returns every violation at once.
    fn validate(&self) -> Result<(), AuthError> {
        let mut errors = BTreeMap::new();

        let email = self.email.trim();
        if email.is_empty() {
            errors.insert("email", "Email is required");
        } else if email.chars().count() > EMAIL_MAX_LENGTH {
            errors.insert("email", "Email must be at most 50 characters");
        } else if !is_email(email) {
            errors.insert("email", "Email must be a well-formed email address");
        }

        let username = self.username.trim();
        if username.is_empty() {
            errors.insert("username", "Username is required");
        } else if username.chars().count() > USERNAME_MAX_LENGTH {
            errors.insert("username", "Username must be at most 20 characters");
        }

        if self.password.trim().is_empty() {
            errors.insert("password", "Password is required");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(errors))
        }
    }
}

/// `local@domain`, one `@`, no whitespace, dot-separated non-empty domain labels.
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.split('.').all(|label| !label.is_empty())
}

/// Verifies credentials and registers identities.
#[derive(Clone)]
pub struct AuthenticationEngine {
    directory: Arc<dyn UserDirectory>,
    verifier: Arc<dyn CredentialVerifier>,
    /// Hash checked when the subject is unknown, so both failure paths do the
    /// same amount of work.
    dummy_hash: Arc<str>,
}

impl AuthenticationEngine {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, CredentialError> {
        let mut bytes = [0u8; 24];
        rand::rng().fill_bytes(&mut bytes);
        let dummy_hash = verifier.hash(&STANDARD_NO_PAD.encode(bytes))?;

        Ok(Self {
            directory,
            verifier,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Check a subject key and secret. Unknown subject and wrong secret are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, subject: &str, secret: &str) -> Result<Identity, AuthError> {
        let stored = self.directory.find_credentials(subject).await?;

        let (identity, hash) = match stored {
            Some(stored) => (Some(stored.identity), Arc::<str>::from(stored.password_hash)),
            None => (None, self.dummy_hash.clone()),
        };
        let matches = self.verify_secret(secret, hash).await?;

        let Some(identity) = identity else {
            info!("Login attempt for unknown subject");
            return Err(AuthError::InvalidCredentials);
        };
        if !matches {
            info!(user_id = identity.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        if !identity.enabled {
            warn!(user_id = identity.id, "Login attempt on disabled account");
            return Err(AuthError::AccountDisabled);
        }
        if identity.locked {
            warn!(user_id = identity.id, "Login attempt on locked account");
            return Err(AuthError::AccountLocked);
        }

        Ok(identity)
    }

    /// Create a new, disabled identity.
    pub async fn register_identity(
        &self,
        request: RegistrationRequest,
    ) -> Result<Identity, AuthError> {
        request.validate()?;

        let email = request.email.trim().to_string();
        let username = request.username.trim().to_string();

        if self.directory.email_exists(&email).await? {
            return Err(AuthError::DuplicateSubject(UniqueField::Email));
        }
        if self.directory.username_exists(&username).await? {
            return Err(AuthError::DuplicateSubject(UniqueField::Username));
        }

        let role = match request.role.as_deref().map(str::trim) {
            None | Some("") => Role::DEFAULT,
            Some(name) => Role::parse(name).ok_or_else(|| AuthError::RoleNotFound(name.into()))?,
        };
        if !self.directory.role_exists(role).await? {
            return Err(AuthError::RoleNotFound(role.as_str().into()));
        }

        let password_hash = self.hash_secret(request.password).await?;

        let identity = self
            .directory
            .create_identity(NewIdentity {
                email,
                username,
                first_name: non_blank(request.first_name),
                last_name: non_blank(request.last_name),
                password_hash,
                role,
                enabled: false,
            })
            .await?;

        info!(user_id = identity.id, role = %role, "Registered new identity");
        Ok(identity)
    }

    async fn verify_secret(&self, secret: &str, hash: Arc<str>) -> Result<bool, AuthError> {
        let verifier = self.verifier.clone();
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || verifier.verify(&secret, &hash))
            .await
            .map_err(|e| AuthError::Credentials(CredentialError::Hashing(e.to_string())))
    }

    async fn hash_secret(&self, secret: String) -> Result<String, AuthError> {
        let verifier = self.verifier.clone();
        tokio::task::spawn_blocking(move || verifier.hash(&secret))
            .await
            .map_err(|e| AuthError::Credentials(CredentialError::Hashing(e.to_string())))?
            .map_err(AuthError::from)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Argon2Verifier;
    use crate::db::Database;

    async fn engine() -> (AuthenticationEngine, Database) {
        let db = Database::open(":memory:").await.unwrap();
        let verifier = Arc::new(Argon2Verifier::with_cost(8, 1, 1).unwrap());
        let engine = AuthenticationEngine::new(Arc::new(db.clone()), verifier).unwrap();
        (engine, db)
    }

    fn request(email: &str, username: &str) -> RegistrationRequest {
        RegistrationRequest {
            first_name: Some("Frank".into()),
            last_name: Some("Castle".into()),
            username: username.into(),
            email: email.into(),
            password: "hunter22".into(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_register_defaults_to_user_role_and_disabled() {
        let (engine, _db) = engine().await;
        let identity = engine
            .register_identity(request("frank@example.com", "frank"))
            .await
            .unwrap();

        assert_eq!(identity.subject, "frank@example.com");
        assert!(identity.has_role(Role::User));
        assert!(!identity.has_role(Role::Admin));
        assert!(!identity.enabled);
    }

    #[tokio::test]
    async fn test_register_with_explicit_role() {
        let (engine, _db) = engine().await;
        let mut req = request("root@example.com", "root");
        req.role = Some("ROLE_ADMIN".into());

        let identity = engine.register_identity(req).await.unwrap();
        assert!(identity.has_role(Role::Admin));
    }

    #[tokio::test]
    async fn test_register_unknown_role() {
        let (engine, _db) = engine().await;
        let mut req = request("x@example.com", "x");
        req.role = Some("ROLE_SUPERUSER".into());

        let err = engine.register_identity(req).await.unwrap_err();
        assert!(matches!(err, AuthError::RoleNotFound(ref name) if name == "ROLE_SUPERUSER"));
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let (engine, _db) = engine().await;
        engine
            .register_identity(request("frank@example.com", "frank"))
            .await
            .unwrap();

        let err = engine
            .register_identity(request("frank@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateSubject(UniqueField::Email)));

        let err = engine
            .register_identity(request("other@example.com", "frank"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateSubject(UniqueField::Username)));
    }

    #[tokio::test]
    async fn test_register_validation_collects_all_fields() {
        let (engine, _db) = engine().await;
        let req = RegistrationRequest {
            first_name: None,
            last_name: None,
            username: "a-name-that-is-far-too-long".into(),
            email: "not-an-email".into(),
            password: "   ".into(),
            role: None,
        };

        let Err(AuthError::Validation(errors)) = engine.register_identity(req).await else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("username"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email("a@b"));
        assert!(is_email("first.last@example.co.uk"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("user@"));
        assert!(!is_email("user@@example.com"));
        assert!(!is_email("us er@example.com"));
        assert!(!is_email("user@example..com"));
    }

    #[tokio::test]
    async fn test_authenticate_checks_credentials_before_account_state() {
        let (engine, db) = engine().await;
        engine
            .register_identity(request("frank@example.com", "frank"))
            .await
            .unwrap();

        // Disabled account, wrong password: nothing about the account leaks.
        let err = engine
            .authenticate("frank@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = engine
            .authenticate("frank@example.com", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));

        db.users().set_enabled("frank@example.com", true).await.unwrap();
        let identity = engine
            .authenticate("frank@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(identity.username, "frank");

        db.users().set_locked("frank@example.com", true).await.unwrap();
        let err = engine
            .authenticate("frank@example.com", "hunter22")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
    }

    #[tokio::test]
    async fn test_unknown_subject_and_wrong_password_look_the_same() {
        let (engine, db) = engine().await;
        engine
            .register_identity(request("frank@example.com", "frank"))
            .await
            .unwrap();
        db.users().set_enabled("frank@example.com", true).await.unwrap();

        let unknown = engine
            .authenticate("nobody@example.com", "hunter22")
            .await
            .unwrap_err();
        let wrong = engine
            .authenticate("frank@example.com", "nope")
            .await
            .unwrap_err();

        assert_eq!(unknown.status_code(), wrong.status_code());
        assert_eq!(unknown.message(), wrong.message());
    }
}
