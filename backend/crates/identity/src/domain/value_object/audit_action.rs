use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity-affecting action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SignedUp,
    SignedIn,
    OauthLinked,
    PasswordChanged,
    UsernameChanged,
    RoleAssigned,
    RoleRevoked,
    AccountDeactivated,
    AccountSuspended,
    AccountReactivated,
}

impl AuditAction {
    pub const fn code(&self) -> &'static str {
        use AuditAction::*;
        match self {
            SignedUp => "SIGNED_UP",
            SignedIn => "SIGNED_IN",
            OauthLinked => "OAUTH_LINKED",
            PasswordChanged => "PASSWORD_CHANGED",
            UsernameChanged => "USERNAME_CHANGED",
            RoleAssigned => "ROLE_ASSIGNED",
            RoleRevoked => "ROLE_REVOKED",
            AccountDeactivated => "ACCOUNT_DEACTIVATED",
            AccountSuspended => "ACCOUNT_SUSPENDED",
            AccountReactivated => "ACCOUNT_REACTIVATED",
        }
    }

    pub fn from_code(code: &str) -> AppResult<Self> {
        use AuditAction::*;
        Ok(match code {
            "SIGNED_UP" => SignedUp,
            "SIGNED_IN" => SignedIn,
            "OAUTH_LINKED" => OauthLinked,
            "PASSWORD_CHANGED" => PasswordChanged,
            "USERNAME_CHANGED" => UsernameChanged,
            "ROLE_ASSIGNED" => RoleAssigned,
            "ROLE_REVOKED" => RoleRevoked,
            "ACCOUNT_DEACTIVATED" => AccountDeactivated,
            "ACCOUNT_SUSPENDED" => AccountSuspended,
            "ACCOUNT_REACTIVATED" => AccountReactivated,
            other => {
                return Err(AppError::internal(format!("Unknown audit action in store: {other}")));
            }
        })
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matches_serde() {
        for action in [
            AuditAction::SignedUp,
            AuditAction::OauthLinked,
            AuditAction::AccountReactivated,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.code()));
            assert_eq!(AuditAction::from_code(action.code()).unwrap(), action);
        }
        assert!(AuditAction::from_code("DELETED").is_err());
    }
}
