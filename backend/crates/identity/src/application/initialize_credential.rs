//! Initialize Local Credential Use Case
//!
//! Lets a federated-only account add a password.

use std::sync::Arc;

use kernel::id::AccountId;
use platform::password::{ClearTextPassword, CredentialHasher};

use crate::application::retry::save_with_retry;
use crate::domain::entity::Account;
use crate::domain::repository::AccountStore;
use crate::error::{IdentityError, IdentityResult};

pub struct InitializeCredentialInput {
    pub account_id: AccountId,
    pub password: String,
}

pub struct InitializeCredentialUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
    hasher: Arc<dyn CredentialHasher>,
}

impl<S> InitializeCredentialUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub async fn execute(&self, input: InitializeCredentialInput) -> IdentityResult<AccountId> {
        let password = ClearTextPassword::new(input.password)?;

        let account = self
            .store
            .find_by_id(&input.account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        ensure_uninitialized(&account)?;

        let hash = self.hasher.encode(&password)?;
        save_with_retry(self.store.as_ref(), account, |account| {
            ensure_uninitialized(account)?;
            account.initialize_credential(hash.clone())
        })
        .await?;

        tracing::info!(account_id = %input.account_id, "Local credential initialized");

        Ok(input.account_id)
    }
}

fn ensure_uninitialized(account: &Account) -> IdentityResult<()> {
    if !account.is_active() {
        return Err(IdentityError::AccountInactive);
    }
    if account.has_local_credentials() {
        return Err(IdentityError::CredentialAlreadySet);
    }
    Ok(())
}
