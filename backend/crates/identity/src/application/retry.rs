//! Stale Snapshot Retry
//!
//! Use cases mutate an account they loaded earlier. When a concurrent save
//! committed in between, the store rejects the write with `StaleAccount`; the
//! change is then re-applied once to a freshly loaded account, so its checks
//! run against the current state.

use crate::domain::entity::Account;
use crate::domain::repository::AccountStore;
use crate::error::{IdentityError, IdentityResult};

/// Apply `change` to `account` and save it if anything was recorded
///
/// On `StaleAccount` the account is reloaded and `change` runs a second time.
/// A second stale save is returned to the caller.
pub(crate) async fn save_with_retry<S, F, T>(
    store: &S,
    mut account: Account,
    change: F,
) -> IdentityResult<(Account, T)>
where
    S: AccountStore,
    F: Fn(&mut Account) -> IdentityResult<T>,
{
    let outcome = change(&mut account)?;
    match save_if_changed(store, &mut account).await {
        Ok(()) => Ok((account, outcome)),
        Err(IdentityError::StaleAccount) => {
            tracing::warn!(
                account_id = %account.account_id(),
                "Account changed concurrently, re-applying on fresh state"
            );
            let mut fresh = store
                .find_by_id(&account.account_id())
                .await?
                .ok_or(IdentityError::AccountNotFound)?;
            let outcome = change(&mut fresh)?;
            save_if_changed(store, &mut fresh).await?;
            Ok((fresh, outcome))
        }
        Err(e) => Err(e),
    }
}

/// Every mutation records a fact, so no facts means nothing to write
async fn save_if_changed<S: AccountStore>(store: &S, account: &mut Account) -> IdentityResult<()> {
    if account.pending_facts().is_empty() {
        return Ok(());
    }
    store.save(account).await
}
