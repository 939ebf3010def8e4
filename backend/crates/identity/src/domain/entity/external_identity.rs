//! External Identity Entity
//!
//! A federated login binding. `(provider, provider_user_id)` is globally unique.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::domain::value_object::Provider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub account_id: AccountId,
    pub provider: Provider,
    /// Opaque subject id issued by the provider
    pub provider_user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub linked_at: DateTime<Utc>,
}

impl ExternalIdentity {
    pub fn new(
        account_id: AccountId,
        provider: Provider,
        provider_user_id: impl Into<String>,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            account_id,
            provider,
            provider_user_id: provider_user_id.into(),
            display_name,
            avatar_url,
            linked_at: Utc::now(),
        }
    }

    pub fn matches(&self, provider: Provider, provider_user_id: &str) -> bool {
        self.provider == provider && self.provider_user_id == provider_user_id
    }
}
