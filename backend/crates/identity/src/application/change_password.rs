//! Change Password Use Case

use std::sync::Arc;

use kernel::id::AccountId;
use platform::password::{ClearTextPassword, CredentialHasher};

use crate::application::retry::save_with_retry;
use crate::domain::repository::AccountStore;
use crate::error::{IdentityError, IdentityResult};

/// Pre-validated change-password request
///
/// Construction fails when the new password breaks the policy or equals the
/// current one.
#[derive(Debug)]
pub struct ChangePasswordCommand {
    account_id: AccountId,
    current: ClearTextPassword,
    new: ClearTextPassword,
}

impl ChangePasswordCommand {
    pub fn new(account_id: AccountId, current: String, new: String) -> IdentityResult<Self> {
        let current = ClearTextPassword::from_input(current);
        let new = ClearTextPassword::new(new)?;
        if current.same_as(&new) {
            return Err(IdentityError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }
        Ok(Self {
            account_id,
            current,
            new,
        })
    }
}

/// Change password use case
pub struct ChangePasswordUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
    hasher: Arc<dyn CredentialHasher>,
}

impl<S> ChangePasswordUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub async fn execute(&self, command: ChangePasswordCommand) -> IdentityResult<AccountId> {
        let account = self
            .store
            .find_by_id(&command.account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let credential = account
            .credential()
            .ok_or(IdentityError::NoLocalCredential)?;

        if !self.hasher.matches(&command.current, &credential.password_hash) {
            tracing::warn!(
                account_id = %command.account_id,
                "Password change rejected: current password mismatch"
            );
            return Err(IdentityError::InvalidCredentials);
        }

        let verified = credential.password_hash.clone();
        let new_hash = self.hasher.encode(&command.new)?;
        save_with_retry(self.store.as_ref(), account, |account| {
            match account.credential() {
                Some(current) if current.password_hash == verified => {}
                _ => return Err(IdentityError::InvalidCredentials),
            }
            account.change_password(new_hash.clone())
        })
        .await?;

        tracing::info!(account_id = %command.account_id, "Password changed");

        Ok(command.account_id)
    }
}
