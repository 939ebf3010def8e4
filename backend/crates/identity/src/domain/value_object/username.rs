//! Username Value Object
//!
//! The username is the public handle of an account, used for sign-in and display.
//!
//! ## Rules
//! - NFKC normalization, trim, then validation on the lowercase form
//! - Length: 3 to 32 characters
//! - Charset: `a-z 0-9 _ . -`
//! - First and last character: alphanumeric or `_`
//! - No `..`, at least one alphanumeric, not a reserved word
//!
//! The original casing is kept for display; uniqueness is decided on the
//! canonical (lowercase) form.

use kernel::error::app_error::AppError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 32;

/// Prefix of usernames minted for federated accounts
pub const GENERATED_PREFIX: &str = "user_";

/// Random suffix length of generated usernames
pub const GENERATED_SUFFIX_LENGTH: usize = 12;

const GENERATED_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-'];

const RESERVED_WORDS: &[&str] = &[
    // System / staff
    "admin",
    "administrator",
    "root",
    "system",
    "superuser",
    "moderator",
    "staff",
    "support",
    "instructor",
    "student",
    // Routing
    "api",
    "auth",
    "oauth",
    "callback",
    "identity",
    "login",
    "logout",
    "signin",
    "signout",
    "signup",
    "register",
    "password",
    "token",
    // Resources
    "user",
    "users",
    "account",
    "accounts",
    "profile",
    "settings",
    // Misc
    "me",
    "self",
    "null",
    "undefined",
    "anonymous",
    "guest",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("Username cannot be empty")]
    Empty,

    #[error("Username is too short ({length} chars, minimum {min})")]
    TooShort { length: usize, min: usize },

    #[error("Username is too long ({length} chars, maximum {max})")]
    TooLong { length: usize, max: usize },

    #[error("Invalid character '{char}' at position {position}. Only a-z, 0-9, _, ., - are allowed")]
    InvalidCharacter { char: char, position: usize },

    #[error("Username cannot start with '{char}'. Must start with a-z, 0-9, or _")]
    InvalidStart { char: char },

    #[error("Username cannot end with '{char}'. Must end with a-z, 0-9, or _")]
    InvalidEnd { char: char },

    #[error("Username cannot contain consecutive dots (..)")]
    ConsecutiveDots,

    #[error("Username must contain at least one letter or digit")]
    NoAlphanumeric,

    #[error("'{word}' is a reserved username")]
    Reserved { word: String },
}

impl From<UsernameError> for AppError {
    fn from(err: UsernameError) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Validated, normalized username
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username {
    /// Display form (preserves case)
    original: String,
    /// Lowercase form used for uniqueness
    canonical: String,
}

impl Username {
    pub fn new(input: impl AsRef<str>) -> Result<Self, UsernameError> {
        let original: String = input.as_ref().nfkc().collect::<String>().trim().to_string();
        let canonical = original.to_lowercase();
        Self::validate(&canonical)?;
        Ok(Self {
            original,
            canonical,
        })
    }

    /// Mint a `user_` + 12 random `[a-z0-9]` username
    ///
    /// Uniqueness is the caller's concern; see the federated provisioning path.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..GENERATED_SUFFIX_LENGTH)
            .map(|_| GENERATED_CHARSET[rng.random_range(0..GENERATED_CHARSET.len())] as char)
            .collect();
        let value = format!("{GENERATED_PREFIX}{suffix}");
        Self {
            original: value.clone(),
            canonical: value,
        }
    }

    /// Rebuild from a stored display form
    pub fn from_db(original: impl Into<String>) -> Self {
        let original = original.into();
        let canonical = original.to_lowercase();
        Self {
            original,
            canonical,
        }
    }

    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[inline]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn is_reserved(name: &str) -> bool {
        let canonical = name.nfkc().collect::<String>().trim().to_lowercase();
        RESERVED_WORDS.contains(&canonical.as_str())
    }

    fn validate(canonical: &str) -> Result<(), UsernameError> {
        let (Some(first), Some(last)) = (canonical.chars().next(), canonical.chars().next_back())
        else {
            return Err(UsernameError::Empty);
        };

        let length = canonical.chars().count();
        if length < USERNAME_MIN_LENGTH {
            return Err(UsernameError::TooShort {
                length,
                min: USERNAME_MIN_LENGTH,
            });
        }
        if length > USERNAME_MAX_LENGTH {
            return Err(UsernameError::TooLong {
                length,
                max: USERNAME_MAX_LENGTH,
            });
        }

        if let Some((position, char)) = canonical
            .chars()
            .enumerate()
            .find(|(_, c)| !Self::is_valid_char(*c))
        {
            return Err(UsernameError::InvalidCharacter { char, position });
        }

        if !Self::is_valid_edge_char(first) {
            return Err(UsernameError::InvalidStart { char: first });
        }
        if !Self::is_valid_edge_char(last) {
            return Err(UsernameError::InvalidEnd { char: last });
        }

        if canonical.contains("..") {
            return Err(UsernameError::ConsecutiveDots);
        }

        if !canonical.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(UsernameError::NoAlphanumeric);
        }

        if RESERVED_WORDS.contains(&canonical) {
            return Err(UsernameError::Reserved {
                word: canonical.to_string(),
            });
        }

        Ok(())
    }

    #[inline]
    fn is_valid_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || ALLOWED_SPECIAL_CHARS.contains(&c)
    }

    #[inline]
    fn is_valid_edge_char(c: char) -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
    }
}

impl fmt::Debug for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Username").field(&self.original).finish()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(name: Username) -> Self {
        name.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_keeps_display_case() {
        let name = Username::new("  AlIcE_123  ").unwrap();
        assert_eq!(name.canonical(), "alice_123");
        assert_eq!(name.original(), "AlIcE_123");
        assert_eq!(name.to_string(), "AlIcE_123");
    }

    #[test]
    fn test_nfkc_full_width() {
        // Full-width 'Ａ' (U+FF21) becomes ASCII
        assert_eq!(Username::new("Ａlice").unwrap().canonical(), "alice");
    }

    #[test]
    fn test_length_bounds() {
        assert!(matches!(Username::new(""), Err(UsernameError::Empty)));
        assert!(matches!(Username::new("   "), Err(UsernameError::Empty)));
        assert!(matches!(
            Username::new("ab"),
            Err(UsernameError::TooShort { length: 2, .. })
        ));
        assert!(Username::new("abc").is_ok());
        assert!(Username::new("a".repeat(32)).is_ok());
        assert!(matches!(
            Username::new("a".repeat(33)),
            Err(UsernameError::TooLong { length: 33, .. })
        ));
    }

    #[test]
    fn test_charset() {
        assert!(Username::new("john.doe-99").is_ok());
        assert!(matches!(
            Username::new("john+doe"),
            Err(UsernameError::InvalidCharacter { char: '+', position: 4 })
        ));
        assert!(matches!(
            Username::new("john doe"),
            Err(UsernameError::InvalidCharacter { char: ' ', .. })
        ));
        assert!(matches!(
            Username::new("jöhn"),
            Err(UsernameError::InvalidCharacter { .. })
        ));
    }

    #[test]
    fn test_edges_and_dots() {
        assert!(Username::new("_john_").is_ok());
        assert!(matches!(
            Username::new(".john"),
            Err(UsernameError::InvalidStart { char: '.' })
        ));
        assert!(matches!(
            Username::new("john-"),
            Err(UsernameError::InvalidEnd { char: '-' })
        ));
        assert!(matches!(
            Username::new("jo..hn"),
            Err(UsernameError::ConsecutiveDots)
        ));
        assert!(matches!(
            Username::new("___"),
            Err(UsernameError::NoAlphanumeric)
        ));
    }

    #[test]
    fn test_reserved() {
        assert!(matches!(
            Username::new("Admin"),
            Err(UsernameError::Reserved { .. })
        ));
        assert!(Username::is_reserved(" ROOT "));
        assert!(!Username::is_reserved("alice"));
        // Containing a reserved word is fine
        assert!(Username::new("admin_alice").is_ok());
    }

    #[test]
    fn test_generated_shape() {
        for _ in 0..50 {
            let name = Username::generate();
            let value = name.canonical();
            assert!(value.starts_with(GENERATED_PREFIX));
            let suffix = &value[GENERATED_PREFIX.len()..];
            assert_eq!(suffix.len(), GENERATED_SUFFIX_LENGTH);
            assert!(
                suffix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            );
            // Generated names always pass the regular rules
            assert_eq!(Username::new(value).unwrap(), name);
        }
    }

    #[test]
    fn test_error_maps_to_validation() {
        let err: AppError = Username::new("x").unwrap_err().into();
        assert_eq!(err.kind(), kernel::error::kind::ErrorKind::Validation);
    }
}
