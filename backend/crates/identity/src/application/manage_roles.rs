//! Role Management Use Cases

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::retry::save_with_retry;
use crate::domain::repository::AccountStore;
use crate::domain::value_object::Role;
use crate::error::{IdentityError, IdentityResult};

pub struct RoleChangeInput {
    /// Who grants or revokes
    pub actor_id: AccountId,
    pub account_id: AccountId,
    pub role: String,
}

pub struct ManageRolesUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
}

impl<S> ManageRolesUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Grant a role. Granting a held role is a no-op.
    pub async fn assign(&self, input: RoleChangeInput) -> IdentityResult<AccountId> {
        let role = Role::from_name(&input.role)?;
        let account = self
            .store
            .find_by_id(&input.account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let (_, granted) = save_with_retry(self.store.as_ref(), account, |account| {
            Ok(account.add_role(role, input.actor_id))
        })
        .await?;

        if granted {
            tracing::info!(
                account_id = %input.account_id,
                actor_id = %input.actor_id,
                role = role.code(),
                "Role assigned"
            );
        }
        Ok(input.account_id)
    }

    /// Revoke a role. The last remaining role cannot be revoked.
    pub async fn revoke(&self, input: RoleChangeInput) -> IdentityResult<AccountId> {
        let role = Role::from_name(&input.role)?;
        let account = self
            .store
            .find_by_id(&input.account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let (_, revoked) = save_with_retry(self.store.as_ref(), account, |account| {
            account.remove_role(role, input.actor_id)
        })
        .await?;

        if revoked {
            tracing::info!(
                account_id = %input.account_id,
                actor_id = %input.actor_id,
                role = role.code(),
                "Role revoked"
            );
        }
        Ok(input.account_id)
    }
}
