//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::{Account, AuditMetadata, AuditRecord};
use crate::domain::token::TokenPair;

// ============================================================================
// Sign Up / Sign In
// ============================================================================

/// Sign up request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Sign in request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    /// Username or email
    pub identifier: String,
    pub password: String,
}

/// Account plus a fresh token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub account: AccountResponse,
    pub tokens: TokenPair,
}

// ============================================================================
// Federated Sign In
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStateResponse {
    pub state: String,
}

/// Provider callback, relayed by the frontend after the broker's code exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackRequest {
    pub state: String,
    /// Broker-signed federation assertion bound to `state`
    pub assertion: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedSignInResponse {
    pub account: AccountResponse,
    pub tokens: TokenPair,
    /// `existing_identity`, `linked_by_email` or `provisioned`
    pub resolution: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// ============================================================================
// Account Maintenance
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    /// `ACTIVE`, `DEACTIVATED` or `SUSPENDED`
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdResponse {
    pub account_id: String,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedIdentityResponse {
    pub provider: &'static str,
    pub provider_user_id: String,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub account_id: String,
    pub email: String,
    pub username: String,
    pub status: &'static str,
    pub roles: Vec<&'static str>,
    pub has_local_credential: bool,
    pub linked_identities: Vec<LinkedIdentityResponse>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id().to_string(),
            email: account.email().as_str().to_string(),
            username: account.username().original().to_string(),
            status: account.status().code(),
            roles: account.roles().iter().map(|r| r.code()).collect(),
            has_local_credential: account.has_local_credentials(),
            linked_identities: account
                .external_identities()
                .iter()
                .map(|i| LinkedIdentityResponse {
                    provider: i.provider.code(),
                    provider_user_id: i.provider_user_id.clone(),
                    linked_at: i.linked_at,
                })
                .collect(),
            display_name: account.display_name().map(str::to_string),
            avatar_url: account.avatar_url().map(str::to_string),
            last_sign_in_at: account.last_sign_in_at(),
            created_at: account.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordResponse {
    pub audit_id: String,
    pub actor_id: String,
    pub action: &'static str,
    pub metadata: AuditMetadata,
    pub occurred_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditRecordResponse {
    fn from(record: AuditRecord) -> Self {
        Self {
            audit_id: record.audit_id.to_string(),
            actor_id: record.actor_id.to_string(),
            action: record.action.code(),
            metadata: record.metadata,
            occurred_at: record.occurred_at,
        }
    }
}
