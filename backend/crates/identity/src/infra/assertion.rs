//! Federation Assertions
//!
//! The provider's code exchange happens in a federation broker, never in the
//! browser. The broker reports the login as an HS256 JWT signed with a key
//! shared only with this service, and binds it to the OAuth state of the
//! request that started the login (`nonce`). Nothing the client sends besides
//! that signed token is used to pick an account.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use platform::crypto::constant_time_eq;
use serde::{Deserialize, Serialize};

use crate::application::config::IdentityConfig;
use crate::application::federated_sign_in::FederatedSignInInput;
use crate::domain::federation::ProviderAttributes;
use crate::domain::value_object::Provider;
use crate::error::{IdentityError, IdentityResult};

/// Lifetime of assertions built by [`AssertionVerifier::draft`]
pub const ASSERTION_TTL: Duration = Duration::from_secs(120);

/// A federated login as witnessed by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationAssertion {
    /// Provider user id
    pub sub: String,
    /// Provider code
    pub provider: String,
    /// The OAuth state the login was started with
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Raw user-info attributes from the provider
    #[serde(default)]
    pub attributes: ProviderAttributes,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<FederationAssertion> for FederatedSignInInput {
    fn from(assertion: FederationAssertion) -> Self {
        FederatedSignInInput {
            provider: assertion.provider,
            provider_user_id: Some(assertion.sub),
            email: assertion.email,
            email_verified: assertion.email_verified,
            name: assertion.name,
            attributes: assertion.attributes,
            roles: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct AssertionVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Broker identity (`iss`)
    issuer: String,
    /// This service (`aud`)
    audience: String,
}

impl AssertionVerifier {
    pub fn new(secret: &[u8], issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(
            &config.assertion_secret,
            config.assertion_issuer.clone(),
            config.issuer.clone(),
        )
    }

    /// Unsigned assertion for `subject`, addressed to this service
    pub fn draft(&self, provider: Provider, subject: &str, nonce: &str) -> FederationAssertion {
        let now = Utc::now().timestamp();
        FederationAssertion {
            sub: subject.to_string(),
            provider: provider.code().to_string(),
            nonce: nonce.to_string(),
            email: None,
            email_verified: None,
            name: None,
            attributes: ProviderAttributes::new(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + ASSERTION_TTL.as_secs() as i64,
        }
    }

    pub fn sign(&self, assertion: &FederationAssertion) -> IdentityResult<String> {
        encode(&Header::new(Algorithm::HS256), assertion, &self.encoding_key)
            .map_err(|e| IdentityError::Internal(format!("assertion signing failed: {e}")))
    }

    /// Verify `token` for a callback on `provider` carrying `state`
    ///
    /// Signature, expiry, issuer, audience, provider and nonce must all hold;
    /// any failure is an `InvalidAssertion`.
    pub fn verify(&self, token: &str, provider: Provider, state: &str) -> IdentityResult<FederationAssertion> {
        match self.check(token, provider, state) {
            Ok(assertion) => Ok(assertion),
            Err(reason) => {
                tracing::warn!(provider = %provider, reason, "Federation assertion rejected");
                Err(IdentityError::InvalidAssertion)
            }
        }
    }

    fn check(&self, token: &str, provider: Provider, state: &str) -> Result<FederationAssertion, &'static str> {
        let assertion = decode::<FederationAssertion>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims)
            .map_err(|_| "bad signature or claims")?;

        if Provider::federated(&assertion.provider).ok() != Some(provider) {
            return Err("provider mismatch");
        }
        if !constant_time_eq(assertion.nonce.as_bytes(), state.as_bytes()) {
            return Err("nonce mismatch");
        }
        if assertion.sub.trim().is_empty() {
            return Err("missing subject");
        }
        Ok(assertion)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation
    }
}

impl std::fmt::Debug for AssertionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}
