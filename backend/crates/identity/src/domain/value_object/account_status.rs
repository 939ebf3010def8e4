//! Account Status
//!
//! Deactivation is a status flag, never a removal.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum AccountStatus {
    /// Can sign in and use every operation
    #[default]
    Active = 0,

    /// Closed by the owner or an admin
    Deactivated = 1,

    /// Temporarily blocked by an admin
    Suspended = 2,
}

impl AccountStatus {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deactivated => "DEACTIVATED",
            Self::Suspended => "SUSPENDED",
        }
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Active),
            1 => Some(Self::Deactivated),
            2 => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> AppResult<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "DEACTIVATED" => Ok(Self::Deactivated),
            "SUSPENDED" => Ok(Self::Suspended),
            other => Err(AppError::validation(format!("Unknown account status: {other}"))),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_roundtrip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Deactivated,
            AccountStatus::Suspended,
        ] {
            assert_eq!(AccountStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(AccountStatus::from_id(9), None);
    }

    #[test]
    fn test_only_active_is_active() {
        assert!(AccountStatus::Active.is_active());
        assert!(!AccountStatus::Deactivated.is_active());
        assert!(!AccountStatus::Suspended.is_active());
    }

    #[test]
    fn test_from_code() {
        assert_eq!(
            AccountStatus::from_code("suspended").unwrap(),
            AccountStatus::Suspended
        );
        assert!(AccountStatus::from_code("deleted").is_err());
    }
}
