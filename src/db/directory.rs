//! SQLite-backed `UserDirectory`.

use async_trait::async_trait;

use super::Database;
use crate::auth::{Identity, Role};
use crate::directory::{
    DirectoryError, NewIdentity, StoredCredentials, UniqueField, UserDirectory,
};

/// Map a storage error, recognising UNIQUE violations on the users table.
fn directory_error(e: sqlx::Error) -> DirectoryError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("users.email") {
                return DirectoryError::Conflict(UniqueField::Email);
            }
            if message.contains("users.username") {
                return DirectoryError::Conflict(UniqueField::Username);
            }
        }
    }
    tracing::error!(error = %e, "Directory query failed");
    DirectoryError::Storage(e.to_string())
}

#[async_trait]
impl UserDirectory for Database {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<Identity>, DirectoryError> {
        self.users()
            .get_by_email(subject)
            .await
            .map_err(directory_error)
    }

    async fn find_credentials(
        &self,
        subject: &str,
    ) -> Result<Option<StoredCredentials>, DirectoryError> {
        self.users()
            .get_credentials_by_email(subject)
            .await
            .map_err(directory_error)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DirectoryError> {
        self.users().email_exists(email).await.map_err(directory_error)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DirectoryError> {
        self.users()
            .username_exists(username)
            .await
            .map_err(directory_error)
    }

    async fn role_exists(&self, role: Role) -> Result<bool, DirectoryError> {
        self.roles().exists(role).await.map_err(directory_error)
    }

    async fn create_identity(&self, new: NewIdentity) -> Result<Identity, DirectoryError> {
        self.users().create(&new).await.map_err(directory_error)
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, DirectoryError> {
        self.users().list().await.map_err(directory_error)
    }
}
