//! Federated Sign In Use Case
//!
//! Resolves a federated login to exactly one account, in fixed order:
//!
//! 1. the `(provider, provider_user_id)` identity is already linked: sign in
//!    its owner
//! 2. an account with the same email exists: link the identity to it, but
//!    only when the provider verified that email
//! 3. otherwise: provision a new account owning the identity
//!
//! Two first logins for the same identity may race past step 1. The store's
//! uniqueness constraints reject the loser's save, and the loser re-runs the
//! resolution once, which then lands on the winner's account.

use std::sync::Arc;

use crate::application::notifier::{ProfileNotifier, notify_profile_needed};
use crate::domain::entity::{Account, NewExternalIdentity};
use crate::domain::federation::{ProfileDecoder, ProviderAttributes};
use crate::domain::repository::AccountStore;
use crate::domain::value_object::{Email, Provider, Role, Username};
use crate::error::{IdentityError, IdentityResult};

/// Attempts at drawing a free generated username before giving up
///
/// A generated name collides only with another generated name, so in practice
/// the first draw is free. The bound turns a misbehaving generator into an
/// error instead of an endless loop.
const USERNAME_ATTEMPTS: usize = 16;

/// Federated sign in input
///
/// Explicit fields take precedence over values decoded from `attributes`.
pub struct FederatedSignInInput {
    pub provider: String,
    pub provider_user_id: Option<String>,
    pub email: Option<String>,
    /// Whether the provider verified `email`
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub attributes: ProviderAttributes,
    /// Role names for a provisioned account; empty means the default role
    pub roles: Vec<String>,
}

/// Which resolution step produced the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    ExistingIdentity,
    LinkedByEmail,
    Provisioned,
}

impl ResolutionTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::ExistingIdentity => "existing_identity",
            ResolutionTier::LinkedByEmail => "linked_by_email",
            ResolutionTier::Provisioned => "provisioned",
        }
    }
}

#[derive(Debug)]
pub struct FederatedSignInOutput {
    pub account: Account,
    pub tier: ResolutionTier,
}

/// Resolution parameters after decoding and validation
struct Resolution {
    identity: NewExternalIdentity,
    email: Email,
    email_verified: bool,
    roles: Vec<Role>,
}

/// One pass over the resolution tiers
enum Attempt {
    Resolved(FederatedSignInOutput),
    /// A concurrent writer got there first; the pass is worth repeating
    Raced(IdentityError),
}

/// Federated sign in use case
pub struct FederatedSignInUseCase<S>
where
    S: AccountStore,
{
    store: Arc<S>,
    decoder: Arc<dyn ProfileDecoder>,
    notifier: Arc<dyn ProfileNotifier>,
}

impl<S> FederatedSignInUseCase<S>
where
    S: AccountStore,
{
    pub fn new(
        store: Arc<S>,
        decoder: Arc<dyn ProfileDecoder>,
        notifier: Arc<dyn ProfileNotifier>,
    ) -> Self {
        Self {
            store,
            decoder,
            notifier,
        }
    }

    pub async fn execute(&self, input: FederatedSignInInput) -> IdentityResult<FederatedSignInOutput> {
        let resolution = self.prepare(input)?;

        match self.resolve(&resolution).await? {
            Attempt::Resolved(output) => Ok(output),
            Attempt::Raced(e) => {
                tracing::warn!(
                    provider = %resolution.identity.provider,
                    error = %e,
                    "Federated sign-in lost a race, retrying resolution"
                );
                match self.resolve(&resolution).await? {
                    Attempt::Resolved(output) => Ok(output),
                    Attempt::Raced(e) => Err(e),
                }
            }
        }
    }

    fn prepare(&self, input: FederatedSignInInput) -> IdentityResult<Resolution> {
        let provider = Provider::federated(&input.provider)?;
        let profile = self.decoder.decode(provider, &input.attributes)?;

        let provider_user_id = non_blank(input.provider_user_id)
            .or(profile.subject)
            .ok_or_else(|| IdentityError::Validation("Missing provider user id".to_string()))?;
        let email = non_blank(input.email)
            .or(profile.email)
            .ok_or_else(|| IdentityError::Validation("Provider did not supply an email".to_string()))?;
        let email = Email::new(email)?;
        let email_verified = input.email_verified.unwrap_or(profile.email_verified);
        let roles = Role::resolve_all(&input.roles)?;

        Ok(Resolution {
            identity: NewExternalIdentity {
                provider,
                provider_user_id,
                display_name: non_blank(input.name).or(profile.name),
                avatar_url: profile.avatar_url,
            },
            email,
            email_verified,
            roles,
        })
    }

    async fn resolve(&self, resolution: &Resolution) -> IdentityResult<Attempt> {
        let identity = &resolution.identity;

        // Tier 1: identity already linked
        if let Some(mut account) = self
            .store
            .find_by_external_identity(identity.provider, &identity.provider_user_id)
            .await?
        {
            ensure_active(&account)?;
            account.record_sign_in(identity.provider);
            if let Some(e) = self.persist(&mut account).await? {
                return Ok(Attempt::Raced(e));
            }
            return Ok(self.resolved(account, ResolutionTier::ExistingIdentity));
        }

        // Tier 2: merge into the account holding this email
        if let Some(mut account) = self.store.find_by_email(&resolution.email).await? {
            if !resolution.email_verified {
                tracing::warn!(
                    account_id = %account.account_id(),
                    provider = %identity.provider,
                    "Federated email is unverified, refusing to merge"
                );
                return Err(IdentityError::EmailTaken);
            }
            ensure_active(&account)?;
            account.link_external_identity(identity.clone());
            if let Some(e) = self.persist(&mut account).await? {
                return Ok(Attempt::Raced(e));
            }
            return Ok(self.resolved(account, ResolutionTier::LinkedByEmail));
        }

        // Tier 3: provision
        let username = self.free_username().await?;
        let mut account = Account::provision_federated(
            resolution.email.clone(),
            username,
            identity.clone(),
            &resolution.roles,
        );
        if let Some(e) = self.persist(&mut account).await? {
            return Ok(Attempt::Raced(e));
        }
        notify_profile_needed(self.notifier.as_ref(), &account);

        Ok(self.resolved(account, ResolutionTier::Provisioned))
    }

    /// Save, turning a conflict with a concurrent writer into `Some`
    async fn persist(&self, account: &mut Account) -> IdentityResult<Option<IdentityError>> {
        match self.store.save(account).await {
            Ok(()) => Ok(None),
            Err(e) if e.is_conflict() => Ok(Some(e)),
            Err(e) => Err(e),
        }
    }

    fn resolved(&self, account: Account, tier: ResolutionTier) -> Attempt {
        tracing::info!(
            account_id = %account.account_id(),
            tier = tier.as_str(),
            "Federated sign-in resolved"
        );
        Attempt::Resolved(FederatedSignInOutput { account, tier })
    }

    async fn free_username(&self) -> IdentityResult<Username> {
        for _ in 0..USERNAME_ATTEMPTS {
            let candidate = Username::generate();
            if !self.store.exists_by_username(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(IdentityError::Internal(
            "could not generate a free username".to_string(),
        ))
    }
}

fn ensure_active(account: &Account) -> IdentityResult<()> {
    if account.is_active() {
        Ok(())
    } else {
        Err(IdentityError::AccountInactive)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
