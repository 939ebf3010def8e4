//! Identity Provider

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of authentication sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Local,
    Google,
    #[serde(rename = "github")]
    GitHub,
}

impl Provider {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }

    #[inline]
    pub const fn is_federated(&self) -> bool {
        !matches!(self, Provider::Local)
    }

    pub fn from_code(code: &str) -> AppResult<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Provider::Local),
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::GitHub),
            other => Err(AppError::validation(format!("Unsupported provider: {other}"))),
        }
    }

    /// Resolve a provider accepted for federated sign-in
    pub fn federated(code: &str) -> AppResult<Self> {
        let provider = Self::from_code(code)?;
        if !provider.is_federated() {
            return Err(AppError::validation(
                "The local provider cannot be used for federated sign-in",
            ));
        }
        Ok(provider)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(Provider::from_code("GitHub").unwrap(), Provider::GitHub);
        assert_eq!(Provider::from_code("google").unwrap(), Provider::Google);
        assert!(Provider::from_code("myspace").is_err());
    }

    #[test]
    fn test_federated_rejects_local() {
        assert!(Provider::federated("local").is_err());
        assert!(Provider::federated("twitter").is_err());
        assert_eq!(Provider::federated("google").unwrap(), Provider::Google);
    }

    #[test]
    fn test_serde_codes() {
        assert_eq!(serde_json::to_string(&Provider::GitHub).unwrap(), "\"github\"");
        assert_eq!(
            serde_json::from_str::<Provider>("\"google\"").unwrap(),
            Provider::Google
        );
    }
}
