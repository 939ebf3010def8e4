//! Account Status Use Cases (deactivate / suspend / reactivate)

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::retry::save_with_retry;
use crate::domain::repository::AccountStore;
use crate::domain::value_object::AccountStatus;
use crate::error::{IdentityError, IdentityResult};

pub struct ChangeStatusUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
}

impl<S> ChangeStatusUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn deactivate(&self, actor_id: AccountId, account_id: AccountId) -> IdentityResult<AccountId> {
        self.execute(actor_id, account_id, AccountStatus::Deactivated).await
    }

    pub async fn suspend(&self, actor_id: AccountId, account_id: AccountId) -> IdentityResult<AccountId> {
        self.execute(actor_id, account_id, AccountStatus::Suspended).await
    }

    /// Allowed from both SUSPENDED and DEACTIVATED
    pub async fn reactivate(&self, actor_id: AccountId, account_id: AccountId) -> IdentityResult<AccountId> {
        self.execute(actor_id, account_id, AccountStatus::Active).await
    }

    /// Move the account to `status`. Moving to the current status is a no-op.
    pub async fn execute(
        &self,
        actor_id: AccountId,
        account_id: AccountId,
        status: AccountStatus,
    ) -> IdentityResult<AccountId> {
        let account = self
            .store
            .find_by_id(&account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let (_, (from, changed)) = save_with_retry(self.store.as_ref(), account, |account| {
            let from = account.status();
            Ok((from, account.transition_to(status, actor_id)))
        })
        .await?;

        if changed {
            tracing::info!(
                account_id = %account_id,
                actor_id = %actor_id,
                from = from.code(),
                to = status.code(),
                "Account status changed"
            );
        }
        Ok(account_id)
    }
}
