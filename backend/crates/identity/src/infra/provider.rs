//! Provider Profile Decoders
//!
//! Field mappings for each supported provider's user-info payload.

use serde_json::Value;

use crate::domain::federation::{FederatedProfile, ProfileDecoder, ProviderAttributes};
use crate::domain::value_object::Provider;
use crate::error::{IdentityError, IdentityResult};

/// Decoder for every federated [`Provider`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProviderDecoders;

impl ProfileDecoder for ProviderDecoders {
    fn decode(&self, provider: Provider, attributes: &ProviderAttributes) -> IdentityResult<FederatedProfile> {
        match provider {
            Provider::Google => Ok(google(attributes)),
            Provider::GitHub => Ok(github(attributes)),
            Provider::Local => Err(IdentityError::Validation(
                "The local provider has no federated profile".to_string(),
            )),
        }
    }
}

/// OpenID Connect userinfo (`sub`, `email`, `email_verified`, `name`, `picture`)
fn google(attributes: &ProviderAttributes) -> FederatedProfile {
    let name = text(attributes, "name").or_else(|| {
        let given = text(attributes, "given_name");
        let family = text(attributes, "family_name");
        match (given, family) {
            (Some(g), Some(f)) => Some(format!("{g} {f}")),
            (g, f) => g.or(f),
        }
    });

    FederatedProfile {
        subject: text(attributes, "sub"),
        email: text(attributes, "email"),
        name,
        avatar_url: text(attributes, "picture"),
        email_verified: flag(attributes, "email_verified"),
    }
}

/// GitHub REST `/user` (`id`, `login`, `name`, `email`, `avatar_url`)
fn github(attributes: &ProviderAttributes) -> FederatedProfile {
    FederatedProfile {
        subject: text(attributes, "id"),
        email: text(attributes, "email"),
        name: text(attributes, "name").or_else(|| text(attributes, "login")),
        avatar_url: text(attributes, "avatar_url"),
        // Only present when the caller merged in the `/user/emails` entry
        email_verified: flag(attributes, "verified"),
    }
}

/// Non-empty string (numbers are rendered, e.g. GitHub ids)
fn text(attributes: &ProviderAttributes, key: &str) -> Option<String> {
    match attributes.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(attributes: &ProviderAttributes, key: &str) -> bool {
    match attributes.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
