//! Sign In Use Case
//!
//! Local sign-in with email or username. An unknown identifier and a wrong
//! password both come back as `None`, and cost the same hashing work.

use std::sync::Arc;

use platform::password::{ClearTextPassword, CredentialHasher};

use crate::application::retry::save_with_retry;
use crate::domain::entity::Account;
use crate::domain::repository::AccountStore;
use crate::domain::value_object::{LoginIdentifier, Provider};
use crate::error::{IdentityError, IdentityResult};

/// Sign in input
pub struct SignInInput {
    /// Email or username
    pub identifier: String,
    pub password: String,
}

/// Sign in use case
pub struct SignInUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
    hasher: Arc<dyn CredentialHasher>,
}

impl<S> SignInUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// `Ok(None)` means "no match"
    pub async fn execute(&self, input: SignInInput) -> IdentityResult<Option<Account>> {
        let password = ClearTextPassword::from_input(input.password);

        let account = match LoginIdentifier::parse(&input.identifier) {
            Some(identifier) => self.store.find_by_login(&identifier).await?,
            None => None,
        };

        let Some(account) = account else {
            self.hasher.dummy_verify(&password);
            tracing::warn!("Sign-in rejected: no matching account");
            return Ok(None);
        };

        let Some(credential) = account.credential() else {
            return Err(IdentityError::NoLocalCredential);
        };

        if !account.is_active() {
            return Err(IdentityError::AccountInactive);
        }

        if !self.hasher.matches(&password, &credential.password_hash) {
            tracing::warn!(
                account_id = %account.account_id(),
                "Sign-in rejected: wrong password"
            );
            return Ok(None);
        }

        // A concurrent save may have suspended the account or replaced the
        // verified hash; both are re-checked on the fresh state.
        let verified = credential.password_hash.clone();
        let signed_in = save_with_retry(self.store.as_ref(), account, |account| {
            if !account.is_active() {
                return Err(IdentityError::AccountInactive);
            }
            match account.credential() {
                Some(current) if current.password_hash == verified => {}
                _ => return Err(IdentityError::InvalidCredentials),
            }
            account.record_sign_in(Provider::Local);
            Ok(())
        })
        .await;

        match signed_in {
            Ok((account, ())) => {
                tracing::info!(account_id = %account.account_id(), "Account signed in");
                Ok(Some(account))
            }
            Err(IdentityError::InvalidCredentials) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
