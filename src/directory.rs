//! User directory interface.
//!
//! The authentication core only ever talks to storage through this trait;
//! `db::Database` is the SQLite implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::{Identity, Role};

/// Which unique attribute collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Email => f.write_str("Email"),
            UniqueField::Username => f.write_str("Username"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0} already exists")]
    Conflict(UniqueField),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Identity plus the stored password hash. Only the authentication engine
/// sees this; it never leaves the login path.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub identity: Identity,
    pub password_hash: String,
}

/// Record to insert on registration.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a subject key (email) to an identity.
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Identity>, DirectoryError>;

    /// Resolve a subject key together with its password hash.
    async fn find_credentials(
        &self,
        subject: &str,
    ) -> Result<Option<StoredCredentials>, DirectoryError>;

    async fn email_exists(&self, email: &str) -> Result<bool, DirectoryError>;

    async fn username_exists(&self, username: &str) -> Result<bool, DirectoryError>;

    /// Whether the role is registered in the directory.
    async fn role_exists(&self, role: Role) -> Result<bool, DirectoryError>;

    async fn create_identity(&self, new: NewIdentity) -> Result<Identity, DirectoryError>;

    async fn list_identities(&self) -> Result<Vec<Identity>, DirectoryError>;
}
