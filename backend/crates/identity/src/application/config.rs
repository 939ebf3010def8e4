//! Application Configuration
//!
//! Configuration for the identity application layer.

use std::fmt;
use std::time::Duration;

use platform::password::HasherParams;

use crate::error::{IdentityError, IdentityResult};

/// Minimum length of every HS256/HMAC secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Refresh tokens may live between 1 and 30 days
pub const REFRESH_TTL_MIN_DAYS: u64 = 1;
pub const REFRESH_TTL_MAX_DAYS: u64 = 30;

const DAY: u64 = 24 * 3600;

/// Identity application configuration
#[derive(Clone)]
pub struct IdentityConfig {
    /// HS256 signing secret for access and refresh tokens
    pub token_secret: Vec<u8>,
    /// `iss` claim of issued tokens
    pub issuer: String,
    /// Access token lifetime (1 hour)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (14 days)
    pub refresh_token_ttl: Duration,
    /// HMAC key for OAuth state tokens
    pub state_secret: Vec<u8>,
    /// OAuth state token lifetime (10 minutes)
    pub state_ttl: Duration,
    /// HS256 key shared with the federation broker that signs login assertions
    pub assertion_secret: Vec<u8>,
    /// Expected `iss` of federation assertions
    pub assertion_issuer: String,
    /// Argon2id cost parameters
    pub hasher: HasherParams,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Upper bound for a single HTTP request
    pub request_timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            token_secret: Vec::new(),
            issuer: "identity-service".to_string(),
            access_token_ttl: Duration::from_secs(3600),
            refresh_token_ttl: Duration::from_secs(14 * DAY),
            state_secret: Vec::new(),
            state_ttl: Duration::from_secs(600),
            assertion_secret: Vec::new(),
            assertion_issuer: "identity-broker".to_string(),
            hasher: HasherParams::default(),
            password_pepper: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl IdentityConfig {
    /// Create config with random token, state and assertion secrets
    pub fn with_random_secrets() -> Self {
        Self {
            token_secret: platform::crypto::random_bytes(MIN_SECRET_LENGTH),
            state_secret: platform::crypto::random_bytes(MIN_SECRET_LENGTH),
            assertion_secret: platform::crypto::random_bytes(MIN_SECRET_LENGTH),
            ..Default::default()
        }
    }

    /// Create config for development (random secrets, generated on every start)
    pub fn development() -> Self {
        Self::with_random_secrets()
    }

    /// Set the refresh token lifetime in days (1 to 30)
    pub fn with_refresh_ttl_days(mut self, days: u64) -> IdentityResult<Self> {
        if !(REFRESH_TTL_MIN_DAYS..=REFRESH_TTL_MAX_DAYS).contains(&days) {
            return Err(IdentityError::Validation(format!(
                "Refresh token lifetime must be between {REFRESH_TTL_MIN_DAYS} and {REFRESH_TTL_MAX_DAYS} days (got {days})"
            )));
        }
        self.refresh_token_ttl = Duration::from_secs(days * DAY);
        Ok(self)
    }

    /// Check the configuration before the service starts
    pub fn validate(&self) -> IdentityResult<()> {
        if self.token_secret.len() < MIN_SECRET_LENGTH {
            return Err(IdentityError::Validation(format!(
                "Token secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if self.state_secret.len() < MIN_SECRET_LENGTH {
            return Err(IdentityError::Validation(format!(
                "OAuth state secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if self.assertion_secret.len() < MIN_SECRET_LENGTH {
            return Err(IdentityError::Validation(format!(
                "Federation assertion secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if self.issuer.trim().is_empty() || self.assertion_issuer.trim().is_empty() {
            return Err(IdentityError::Validation("Issuer cannot be empty".to_string()));
        }
        if self.access_token_ttl.is_zero() || self.state_ttl.is_zero() {
            return Err(IdentityError::Validation(
                "Token lifetimes must be positive".to_string(),
            ));
        }
        let refresh_days = self.refresh_token_ttl.as_secs() / DAY;
        if self.refresh_token_ttl.as_secs() % DAY != 0
            || !(REFRESH_TTL_MIN_DAYS..=REFRESH_TTL_MAX_DAYS).contains(&refresh_days)
        {
            return Err(IdentityError::Validation(format!(
                "Refresh token lifetime must be a whole number of days between {REFRESH_TTL_MIN_DAYS} and {REFRESH_TTL_MAX_DAYS}"
            )));
        }
        Ok(())
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("token_secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("state_secret", &"[REDACTED]")
            .field("state_ttl", &self.state_ttl)
            .field("assertion_secret", &"[REDACTED]")
            .field("assertion_issuer", &self.assertion_issuer)
            .field("hasher", &self.hasher)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
