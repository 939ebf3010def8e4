//! Credential Entity
//!
//! The local password of an account. At most one per account.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use platform::password::HashedPassword;

#[derive(Debug, Clone)]
pub struct Credential {
    pub account_id: AccountId,
    /// Argon2id PHC string, validated on load
    pub password_hash: HashedPassword,
    pub password_updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(account_id: AccountId, password_hash: HashedPassword) -> Self {
        Self {
            account_id,
            password_hash,
            password_updated_at: Utc::now(),
        }
    }

    pub(crate) fn replace_hash(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
        self.password_updated_at = Utc::now();
    }
}
