//! Sign Up Use Case
//!
//! Creates a new local account.

use std::sync::Arc;

use platform::password::{ClearTextPassword, CredentialHasher};

use crate::application::notifier::{ProfileNotifier, notify_profile_needed};
use crate::domain::entity::Account;
use crate::domain::repository::AccountStore;
use crate::domain::value_object::{Email, Role, Username};
use crate::error::{IdentityError, IdentityResult};

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub username: String,
    pub password: String,
    /// Role names; empty means the default role
    pub roles: Vec<String>,
}

/// Sign up use case
pub struct SignUpUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
    hasher: Arc<dyn CredentialHasher>,
    notifier: Arc<dyn ProfileNotifier>,
}

impl<S> SignUpUseCase<S>
where
    S: AccountStore,
{
    pub fn new(
        store: Arc<S>,
        hasher: Arc<dyn CredentialHasher>,
        notifier: Arc<dyn ProfileNotifier>,
    ) -> Self {
        Self {
            store,
            hasher,
            notifier,
        }
    }

    pub async fn execute(&self, input: SignUpInput) -> IdentityResult<Account> {
        // All input checks happen before the store is consulted
        let email = Email::new(&input.email)?;
        let username = Username::new(&input.username)?;
        let password = ClearTextPassword::new(input.password)?;
        let roles = Role::resolve_all(&input.roles)?;

        if self.store.exists_by_email(&email).await? {
            return Err(IdentityError::EmailTaken);
        }
        if self.store.exists_by_username(&username).await? {
            return Err(IdentityError::UsernameTaken);
        }

        let password_hash = self.hasher.encode(&password)?;
        let mut account = Account::register_local(email, username, password_hash, &roles);

        // A concurrent sign-up that slipped past the checks fails here with
        // the same conflict error.
        self.store.save(&mut account).await?;

        tracing::info!(
            account_id = %account.account_id(),
            username = %account.username(),
            "Account signed up"
        );

        notify_profile_needed(self.notifier.as_ref(), &account);

        Ok(account)
    }
}
