//! Bearer Authentication
//!
//! Extracts and verifies the access token on protected routes, and guards
//! account routes so that only the account itself or an ADMIN may act.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use kernel::id::AccountId;

use crate::domain::value_object::Role;
use crate::error::{IdentityError, IdentityResult};
use crate::infra::jwt::{AccessClaims, JwtTokenIssuer};

const BEARER_PREFIX: &str = "Bearer ";

/// Verified access token claims of the caller
#[derive(Debug, Clone)]
pub struct Authenticated(pub AccessClaims);

impl Authenticated {
    pub fn account_id(&self) -> IdentityResult<AccountId> {
        AccountId::parse_str(&self.0.sub).map_err(|_| IdentityError::InvalidToken)
    }

    pub fn is_admin(&self) -> bool {
        self.0.has_role(Role::Admin.code())
    }

    /// The caller is `account_id` or holds ADMIN
    pub fn ensure_self_or_admin(&self, account_id: &AccountId) -> IdentityResult<()> {
        if self.is_admin() || self.account_id()? == *account_id {
            return Ok(());
        }
        tracing::warn!(caller = %self.0.sub, target = %account_id, "Cross-account request");
        Err(IdentityError::AccessDenied)
    }

    pub fn ensure_admin(&self) -> IdentityResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(IdentityError::AccessDenied)
        }
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<JwtTokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<JwtTokenIssuer>::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(IdentityError::InvalidToken)?;

        let claims = tokens.verify_access(token)?;
        Ok(Authenticated(claims))
    }
}
