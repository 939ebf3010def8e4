//! Identity Error Types
//!
//! Identity-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Email is already registered")]
    EmailTaken,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("External identity is already linked to another account")]
    ExternalIdentityTaken,

    /// The stored account changed after this snapshot was loaded
    #[error("Account was modified concurrently")]
    StaleAccount,

    /// Wrong current password on an authenticated operation
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bearer token missing, malformed, expired or of the wrong type
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account has no local credential")]
    NoLocalCredential,

    #[error("Account already has a local credential")]
    CredentialAlreadySet,

    #[error("Account is not active")]
    AccountInactive,

    #[error("An account must keep at least one role")]
    LastRoleRemoval,

    #[error("Account not found")]
    AccountNotFound,

    /// OAuth state token forged, expired or bound to another provider
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Federation assertion forged, expired or not bound to this login
    #[error("Invalid federation assertion")]
    InvalidAssertion,

    #[error("Not allowed to act on this account")]
    AccessDenied,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        use IdentityError::*;
        match self {
            EmailTaken | UsernameTaken | ExternalIdentityTaken | StaleAccount => ErrorKind::Conflict,
            InvalidCredentials | InvalidToken => ErrorKind::Authentication,
            NoLocalCredential | CredentialAlreadySet | AccountInactive | LastRoleRemoval => {
                ErrorKind::InvalidState
            }
            AccountNotFound => ErrorKind::NotFound,
            StateMismatch | InvalidAssertion => ErrorKind::Security,
            AccessDenied => ErrorKind::Forbidden,
            Validation(_) => ErrorKind::Validation,
            Database(_) | Internal(_) => ErrorKind::Internal,
        }
    }

    /// Uniqueness violation or stale snapshot
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            IdentityError::NoLocalCredential => {
                err.with_action("Sign in with your linked provider or set a password first")
            }
            IdentityError::InvalidToken => err.with_action("Sign in again"),
            _ => err,
        }
    }

    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::InvalidCredentials => {
                tracing::warn!("Invalid credentials presented");
            }
            IdentityError::StateMismatch => {
                tracing::warn!("OAuth state mismatch detected");
            }
            IdentityError::InvalidAssertion => {
                tracing::warn!("Federation assertion rejected");
            }
            IdentityError::AccessDenied => {
                tracing::warn!("Cross-account access attempt rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        // AppError hides the message of Internal errors
        self.to_app_error().into_response()
    }
}

impl From<AppError> for IdentityError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::Validation => IdentityError::Validation(err.message().to_string()),
            _ => IdentityError::Internal(err.to_string()),
        }
    }
}

impl From<platform::password::PasswordPolicyError> for IdentityError {
    fn from(err: platform::password::PasswordPolicyError) -> Self {
        IdentityError::Validation(err.to_string())
    }
}

impl From<platform::password::PasswordHashError> for IdentityError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        IdentityError::Internal(err.to_string())
    }
}

impl From<crate::domain::value_object::UsernameError> for IdentityError {
    fn from(err: crate::domain::value_object::UsernameError) -> Self {
        IdentityError::Validation(err.to_string())
    }
}
