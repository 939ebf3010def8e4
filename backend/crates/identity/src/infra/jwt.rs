//! JWT Token Issuer
//!
//! Stateless HS256 access/refresh tokens. Never touches the store.
//!
//! Access and refresh claims have disjoint required fields (`username`/`roles`
//! vs `type`), so one kind never decodes as the other.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use kernel::id::AccountId;
use serde::{Deserialize, Serialize};

use crate::application::config::IdentityConfig;
use crate::domain::entity::Account;
use crate::domain::token::{TokenIssuer, TokenPair};
use crate::error::{IdentityError, IdentityResult};

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account id
    pub sub: String,
    pub username: String,
    pub email: String,
    /// Role codes
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn has_role(&self, code: &str) -> bool {
        self.roles.iter().any(|r| r == code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Clone)]
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenIssuer {
    pub fn new(secret: &[u8], issuer: impl Into<String>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(
            &config.token_secret,
            config.issuer.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    pub fn issue_access_token(&self, account: &Account) -> IdentityResult<String> {
        self.access_token_at(account, Utc::now().timestamp())
    }

    pub fn issue_refresh_token(&self, account: &Account) -> IdentityResult<String> {
        self.refresh_token_at(account, Utc::now().timestamp())
    }

    pub fn issue_pair(&self, account: &Account) -> IdentityResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: self.issue_refresh_token(account)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.as_secs(),
        })
    }

    fn access_token_at(&self, account: &Account, now: i64) -> IdentityResult<String> {
        let claims = AccessClaims {
            sub: account.account_id().to_string(),
            username: account.username().original().to_string(),
            email: account.email().as_str().to_string(),
            roles: account.roles().iter().map(|r| r.code().to_string()).collect(),
            iat: now,
            exp: now + self.access_ttl.as_secs() as i64,
            iss: self.issuer.clone(),
        };
        self.sign(&claims)
    }

    fn refresh_token_at(&self, account: &Account, now: i64) -> IdentityResult<String> {
        let claims = RefreshClaims {
            sub: account.account_id().to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            iat: now,
            exp: now + self.refresh_ttl.as_secs() as i64,
            iss: self.issuer.clone(),
        };
        self.sign(&claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> IdentityResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| IdentityError::Internal(format!("token signing failed: {e}")))
    }

    /// Signature, expiry and issuer check
    pub fn validate(&self, token: &str) -> bool {
        decode::<serde_json::Value>(token, &self.decoding_key, &self.validation(true)).is_ok()
    }

    /// Extract access claims. Verifies the signature but **not** expiry;
    /// call [`validate`](Self::validate) first.
    pub fn decode_access(&self, token: &str) -> IdentityResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation(false))
            .map(|data| data.claims)
            .map_err(|_| IdentityError::InvalidToken)
    }

    /// Extract refresh claims. Verifies the signature but **not** expiry.
    pub fn decode_refresh(&self, token: &str) -> IdentityResult<RefreshClaims> {
        let claims = decode::<RefreshClaims>(token, &self.decoding_key, &self.validation(false))
            .map(|data| data.claims)
            .map_err(|_| IdentityError::InvalidToken)?;
        if claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(IdentityError::InvalidToken);
        }
        Ok(claims)
    }

    /// `validate` + `decode_access`
    pub fn verify_access(&self, token: &str) -> IdentityResult<AccessClaims> {
        if !self.validate(token) {
            return Err(IdentityError::InvalidToken);
        }
        self.decode_access(token)
    }

    /// `validate` + `decode_refresh`
    pub fn verify_refresh(&self, token: &str) -> IdentityResult<RefreshClaims> {
        if !self.validate(token) {
            return Err(IdentityError::InvalidToken);
        }
        self.decode_refresh(token)
    }

    fn validation(&self, check_exp: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_exp;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue_pair(&self, account: &Account) -> IdentityResult<TokenPair> {
        JwtTokenIssuer::issue_pair(self, account)
    }

    fn refresh_subject(&self, refresh_token: &str) -> IdentityResult<AccountId> {
        let claims = self.verify_refresh(refresh_token)?;
        AccountId::parse_str(&claims.sub).map_err(|_| IdentityError::InvalidToken)
    }
}

impl std::fmt::Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenIssuer")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewExternalIdentity;
    use crate::domain::value_object::{Email, Provider, Role, Username};

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(
            &[1u8; 32],
            "identity-test",
            Duration::from_secs(3600),
            Duration::from_secs(14 * 24 * 3600),
        )
    }

    fn account() -> Account {
        Account::provision_federated(
            Email::new("new@x.com").unwrap(),
            Username::new("NewUser").unwrap(),
            NewExternalIdentity {
                provider: Provider::Google,
                provider_user_id: "g-123".to_string(),
                display_name: None,
                avatar_url: None,
            },
            &[Role::Student, Role::Instructor],
        )
    }

    #[test]
    fn test_access_token_claims() {
        let issuer = issuer();
        let account = account();
        let token = issuer.issue_access_token(&account).unwrap();

        assert!(issuer.validate(&token));
        let claims = issuer.decode_access(&token).unwrap();
        assert_eq!(claims.sub, account.account_id().to_string());
        assert_eq!(claims.username, "NewUser");
        assert_eq!(claims.email, "new@x.com");
        assert_eq!(claims.roles, vec!["STUDENT", "INSTRUCTOR"]);
        assert_eq!(claims.iss, "identity-test");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.has_role("INSTRUCTOR"));
    }

    #[test]
    fn test_refresh_token_claims() {
        let issuer = issuer();
        let account = account();
        let token = issuer.issue_refresh_token(&account).unwrap();

        let claims = issuer.verify_refresh(&token).unwrap();
        assert_eq!(claims.token_type, "refresh");
        assert_eq!(claims.exp - claims.iat, 14 * 24 * 3600);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue_pair(&account()).unwrap();
        assert_eq!(pair.expires_in, 3600);

        assert!(matches!(
            issuer.decode_access(&pair.refresh_token),
            Err(IdentityError::InvalidToken)
        ));
        assert!(matches!(
            issuer.decode_refresh(&pair.access_token),
            Err(IdentityError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_fails_validation_but_decodes() {
        let issuer = issuer();
        let account = account();
        let token = issuer
            .access_token_at(&account, Utc::now().timestamp() - 7200)
            .unwrap();

        assert!(!issuer.validate(&token));
        assert!(issuer.verify_access(&token).is_err());
        // decode_* checks only the signature
        assert!(issuer.decode_access(&token).is_ok());
    }

    #[test]
    fn test_foreign_tokens_rejected() {
        let issuer = issuer();
        let token = issuer.issue_access_token(&account()).unwrap();

        let other_key = JwtTokenIssuer::new(
            &[2u8; 32],
            "identity-test",
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        assert!(!other_key.validate(&token));
        assert!(other_key.decode_access(&token).is_err());

        let other_issuer = JwtTokenIssuer::new(
            &[1u8; 32],
            "someone-else",
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        );
        assert!(!other_issuer.validate(&token));

        assert!(!issuer.validate("garbage"));
    }

    #[test]
    fn test_refresh_subject_is_the_account() {
        let issuer = issuer();
        let account = account();
        let pair = TokenIssuer::issue_pair(&issuer, &account).unwrap();

        assert_eq!(
            issuer.refresh_subject(&pair.refresh_token).unwrap(),
            account.account_id()
        );
        assert!(matches!(
            issuer.refresh_subject(&pair.access_token),
            Err(IdentityError::InvalidToken)
        ));
    }
}
