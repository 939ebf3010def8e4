//! Refresh Tokens Use Case

use std::sync::Arc;

use crate::domain::repository::AccountStore;
use crate::domain::token::{TokenIssuer, TokenPair};
use crate::error::{IdentityError, IdentityResult};

pub struct RefreshTokensUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
    tokens: Arc<dyn TokenIssuer>,
}

impl<S> RefreshTokensUseCase<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    pub async fn execute(&self, refresh_token: &str) -> IdentityResult<TokenPair> {
        let account_id = self.tokens.refresh_subject(refresh_token)?;

        let account = self
            .store
            .find_by_id(&account_id)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        // Status may have changed since the refresh token was issued
        if !account.is_active() {
            return Err(IdentityError::AccountInactive);
        }

        let pair = self.tokens.issue_pair(&account)?;
        tracing::debug!(account_id = %account_id, "Tokens refreshed");
        Ok(pair)
    }
}
