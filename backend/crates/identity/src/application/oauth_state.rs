//! OAuth State Guard
//!
//! Correlates an OAuth callback with the request that started it.
//! Token format: `provider.expiry.nonce.signature` where the signature is the
//! base64url HMAC-SHA256 of `provider.expiry.nonce`.

use std::time::Duration;

use chrono::Utc;
use platform::crypto::{from_base64url, hmac_sha256, random_token, to_base64url, verify_hmac_sha256};

use crate::domain::value_object::Provider;
use crate::error::{IdentityError, IdentityResult};

const NONCE_BYTES: usize = 16;

#[derive(Clone)]
pub struct OAuthStateGuard {
    secret: Vec<u8>,
    ttl: Duration,
}

impl OAuthStateGuard {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Issue a state token bound to `provider`
    pub fn issue(&self, provider: Provider) -> String {
        self.issue_at(provider, Utc::now().timestamp())
    }

    fn issue_at(&self, provider: Provider, now: i64) -> String {
        let expiry = now.saturating_add(self.ttl.as_secs() as i64);
        let payload = format!("{}.{}.{}", provider.code(), expiry, random_token(NONCE_BYTES));
        let signature = to_base64url(&hmac_sha256(&self.secret, payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Verify a state token returned by the provider callback
    ///
    /// Forged, expired or cross-provider tokens are all a `StateMismatch`.
    pub fn verify(&self, token: &str, provider: Provider) -> IdentityResult<()> {
        self.verify_at(token, provider, Utc::now().timestamp())
    }

    fn verify_at(&self, token: &str, provider: Provider, now: i64) -> IdentityResult<()> {
        let result = self.check(token, provider, now);
        if let Err(reason) = result {
            tracing::warn!(provider = %provider, reason, "OAuth state rejected");
            return Err(IdentityError::StateMismatch);
        }
        Ok(())
    }

    fn check(&self, token: &str, provider: Provider, now: i64) -> Result<(), &'static str> {
        let (payload, signature) = token.rsplit_once('.').ok_or("malformed")?;
        let signature = from_base64url(signature).map_err(|_| "malformed signature")?;
        if !verify_hmac_sha256(&self.secret, payload.as_bytes(), &signature) {
            return Err("bad signature");
        }

        let mut parts = payload.splitn(3, '.');
        let (Some(bound_provider), Some(expiry), Some(_nonce)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err("malformed payload");
        };

        if bound_provider != provider.code() {
            return Err("provider mismatch");
        }

        let expiry: i64 = expiry.parse().map_err(|_| "malformed expiry")?;
        if now >= expiry {
            return Err("expired");
        }

        Ok(())
    }
}

impl std::fmt::Debug for OAuthStateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStateGuard")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> OAuthStateGuard {
        OAuthStateGuard::new(vec![7u8; 32], Duration::from_secs(600))
    }

    #[test]
    fn test_issue_and_verify() {
        let guard = guard();
        let token = guard.issue(Provider::Google);
        assert!(token.starts_with("google."));
        assert!(guard.verify(&token, Provider::Google).is_ok());
    }

    #[test]
    fn test_tokens_are_unique() {
        let guard = guard();
        assert_ne!(guard.issue(Provider::GitHub), guard.issue(Provider::GitHub));
    }

    #[test]
    fn test_wrong_provider_rejected() {
        let guard = guard();
        let token = guard.issue(Provider::Google);
        assert!(matches!(
            guard.verify(&token, Provider::GitHub),
            Err(IdentityError::StateMismatch)
        ));
    }

    #[test]
    fn test_expired_rejected() {
        let guard = guard();
        let now = Utc::now().timestamp();
        let token = guard.issue_at(Provider::Google, now - 601);
        assert!(guard.verify_at(&token, Provider::Google, now).is_err());

        let token = guard.issue_at(Provider::Google, now);
        assert!(guard.verify_at(&token, Provider::Google, now + 599).is_ok());
        assert!(guard.verify_at(&token, Provider::Google, now + 600).is_err());
    }

    #[test]
    fn test_tampering_rejected() {
        let guard = guard();
        let token = guard.issue(Provider::Google);

        // Re-bind the payload to another provider, keeping the signature
        let forged = token.replacen("google", "github", 1);
        assert!(guard.verify(&forged, Provider::GitHub).is_err());

        let other = OAuthStateGuard::new(vec![8u8; 32], Duration::from_secs(600));
        assert!(other.verify(&token, Provider::Google).is_err());

        assert!(guard.verify("", Provider::Google).is_err());
        assert!(guard.verify("google.1.2", Provider::Google).is_err());
        assert!(guard.verify("not a token at all", Provider::Google).is_err());
    }
}
