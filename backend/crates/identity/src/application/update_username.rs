//! Update Username Use Case

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::retry::save_with_retry;
use crate::domain::repository::AccountStore;
use crate::domain::value_object::Username;
use crate::error::{IdentityError, IdentityResult};

pub struct UpdateUsernameInput {
    pub account_id: AccountId,
    pub username: String,
}

pub struct UpdateUsernameUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
}

impl<S> UpdateUsernameUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, input: UpdateUsernameInput) -> IdentityResult<AccountId> {
        let username = Username::new(&input.username)?;

        let account = self
            .store
            .find_by_id(&input.account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        // Renaming to one's own name (any casing) is allowed
        if let Some(holder) = self.store.find_by_username(&username).await? {
            if holder.account_id() != account.account_id() {
                return Err(IdentityError::UsernameTaken);
            }
        }

        let (account, old) = save_with_retry(self.store.as_ref(), account, |account| {
            let old = account.username().original().to_string();
            Ok(account.update_username(username.clone()).then_some(old))
        })
        .await?;

        if let Some(old) = old {
            tracing::info!(
                account_id = %input.account_id,
                old = %old,
                new = %account.username(),
                "Username changed"
            );
        }

        Ok(input.account_id)
    }
}
