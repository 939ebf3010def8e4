//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every identity-facing crate.
//! Each kind has a stable machine code and maps onto an HTTP status code.

use serde::Serialize;

/// Error categories
///
/// Identity error taxonomy. Every kind except `Internal` are "expected" outcomes that are
/// decided before any persistent mutation; `Internal` is the only kind that means
/// a backing-service failure.
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::Conflict;
/// assert_eq!(kind.status_code(), 409);
/// assert_eq!(kind.code(), "CONFLICT");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed input. Never reaches the store.
    Validation,
    /// Credential mismatch on an otherwise valid account.
    Authentication,
    /// Operation does not apply to the account's current shape or status.
    InvalidState,
    /// Cross-request correlation failure (e.g. OAuth state mismatch).
    Security,
    /// Authenticated caller may not act on the target account.
    Forbidden,
    /// Referenced account does not exist.
    NotFound,
    /// Uniqueness violation on email, username or provider identity.
    Conflict,
    /// Store or backing-service failure.
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Security => 400,
            ErrorKind::Authentication => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::InvalidState => 422,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable machine-readable code
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Security => "SECURITY",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// User-facing label
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Authentication => "Authentication Error",
            ErrorKind::InvalidState => "Invalid State",
            ErrorKind::Security => "Security Error",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Internal => "Internal Error",
        }
    }

    /// Whether the error originates on the server
    ///
    /// Only these should be logged at error level and only these hide their
    /// message from the caller.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, ErrorKind::Internal)
    }

    /// Whether the error is caused by the client
    #[inline]
    pub const fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::Validation.status_code(), 400);
        assert_eq!(ErrorKind::Security.status_code(), 400);
        assert_eq!(ErrorKind::Authentication.status_code(), 401);
        assert_eq!(ErrorKind::Forbidden.status_code(), 403);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Conflict.status_code(), 409);
        assert_eq!(ErrorKind::InvalidState.status_code(), 422);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidState.code(), "INVALID_STATE");
        assert_eq!(
            serde_json::to_string(&ErrorKind::InvalidState).unwrap(),
            "\"INVALID_STATE\""
        );
    }

    #[test]
    fn test_only_internal_is_server_error() {
        assert!(ErrorKind::Internal.is_server_error());
        assert!(!ErrorKind::Conflict.is_server_error());
        assert!(ErrorKind::Authentication.is_client_error());
    }
}
