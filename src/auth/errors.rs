//! Authentication error types.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::directory::{DirectoryError, UniqueField};
use crate::jwt::TokenError;

/// Failures of login, registration and token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("account is locked")]
    AccountLocked,
    #[error("{0} already registered")]
    DuplicateSubject(UniqueField),
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("registration request failed validation")]
    Validation(BTreeMap<&'static str, &'static str>),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for AuthError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Conflict(field) => AuthError::DuplicateSubject(field),
            other => AuthError::Directory(other),
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled | AuthError::AccountLocked => StatusCode::FORBIDDEN,
            AuthError::DuplicateSubject(_) => StatusCode::CONFLICT,
            AuthError::RoleNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Credentials(_) | AuthError::Directory(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password.",
            AuthError::AccountDisabled => "Your account is disabled. Please contact support.",
            AuthError::AccountLocked => "Your account is locked.",
            AuthError::DuplicateSubject(UniqueField::Email) => "Email already registered",
            AuthError::DuplicateSubject(UniqueField::Username) => "Username already registered",
            AuthError::RoleNotFound(_) => "Role not found",
            AuthError::Validation(_) => "Validation failed",
            AuthError::Token(_) => "Token is invalid or expired",
            AuthError::Credentials(_) | AuthError::Directory(_) => "Internal server error",
        }
    }
}
