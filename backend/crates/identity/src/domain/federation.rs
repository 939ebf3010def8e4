//! Federated Profiles
//!
//! Each federated provider hands back its own attribute bag. A
//! [`ProfileDecoder`] turns it into a [`FederatedProfile`]; nothing past the
//! decoder looks at provider-specific field names.

use serde_json::{Map, Value};

use crate::domain::value_object::Provider;
use crate::error::IdentityResult;

/// Raw attributes as returned by the provider's user-info endpoint
pub type ProviderAttributes = Map<String, Value>;

/// Provider-independent view of a federated login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FederatedProfile {
    pub subject: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
}

pub trait ProfileDecoder: Send + Sync {
    /// Fails for providers without a federated profile (`LOCAL`)
    fn decode(&self, provider: Provider, attributes: &ProviderAttributes) -> IdentityResult<FederatedProfile>;
}
