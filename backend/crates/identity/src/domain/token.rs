//! Session Tokens

use kernel::id::AccountId;
use serde::Serialize;

use crate::domain::entity::Account;
use crate::error::IdentityResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

pub trait TokenIssuer: Send + Sync {
    fn issue_pair(&self, account: &Account) -> IdentityResult<TokenPair>;

    /// Account a valid, unexpired refresh token was issued to
    fn refresh_subject(&self, refresh_token: &str) -> IdentityResult<AccountId>;
}
