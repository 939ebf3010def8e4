//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infrastructure layer.

use kernel::id::AccountId;

use crate::domain::entity::{Account, AuditRecord};
use crate::domain::value_object::{Email, LoginIdentifier, Provider, Username};
use crate::error::IdentityResult;

/// Account aggregate store
///
/// Email, username (canonical) and `(provider, provider_user_id)` are unique at
/// the storage layer; a violation surfaces as the matching conflict error
/// (`EmailTaken`, `UsernameTaken`, `ExternalIdentityTaken`).
#[trait_variant::make(AccountStore: Send)]
pub trait LocalAccountStore {
    async fn find_by_id(&self, account_id: &AccountId) -> IdentityResult<Option<Account>>;

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Account>>;

    async fn find_by_username(&self, username: &Username) -> IdentityResult<Option<Account>>;

    /// Single lookup by email or username
    async fn find_by_login(&self, identifier: &LoginIdentifier) -> IdentityResult<Option<Account>>;

    async fn find_by_external_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> IdentityResult<Option<Account>>;

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool>;

    async fn exists_by_username(&self, username: &Username) -> IdentityResult<bool>;

    /// Persist the whole aggregate and its pending audit facts atomically
    ///
    /// On success the pending facts are cleared. On failure nothing is written.
    async fn save(&self, account: &mut Account) -> IdentityResult<()>;
}

/// Read side of the audit trail
#[trait_variant::make(AuditLog: Send)]
pub trait LocalAuditLog {
    /// Records about `account_id`, oldest first
    async fn list_for_account(&self, account_id: &AccountId) -> IdentityResult<Vec<AuditRecord>>;
}
