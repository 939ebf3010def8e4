//! HTTP Handlers

use axum::Json;
use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kernel::id::AccountId;
use platform::password::{Argon2Hasher, CredentialHasher};
use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::notifier::ProfileNotifier;
use crate::application::oauth_state::OAuthStateGuard;
use crate::application::{
    ChangePasswordCommand, ChangePasswordUseCase, ChangeStatusUseCase, FederatedSignInInput,
    FederatedSignInUseCase, InitializeCredentialInput, InitializeCredentialUseCase,
    ListAuditTrailUseCase, ManageRolesUseCase, RefreshTokensUseCase, RoleChangeInput, SignInInput,
    SignInUseCase, SignUpInput, SignUpUseCase, UpdateUsernameInput, UpdateUsernameUseCase,
};
use crate::domain::federation::ProfileDecoder;
use crate::domain::repository::{AccountStore, AuditLog};
use crate::domain::token::TokenPair;
use crate::domain::value_object::{AccountStatus, Provider};
use crate::error::{IdentityError, IdentityResult};
use crate::infra::assertion::AssertionVerifier;
use crate::infra::jwt::JwtTokenIssuer;
use crate::infra::provider::ProviderDecoders;
use crate::presentation::dto::{
    AccountIdResponse, AccountResponse, AssignRoleRequest, AuditRecordResponse, AuthResponse,
    ChangePasswordRequest, ChangeStatusRequest, FederatedSignInResponse, InitializePasswordRequest,
    OAuthCallbackRequest, OAuthStateResponse, RefreshRequest, SignInRequest, SignUpRequest,
    UpdateUsernameRequest,
};
use crate::presentation::middleware::Authenticated;

/// Shared state for identity handlers
pub struct IdentityAppState<S>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub config: Arc<IdentityConfig>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<JwtTokenIssuer>,
    pub state_guard: Arc<OAuthStateGuard>,
    pub assertions: Arc<AssertionVerifier>,
    pub decoder: Arc<dyn ProfileDecoder>,
    pub notifier: Arc<dyn ProfileNotifier>,
}

impl<S> IdentityAppState<S>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    /// Validate `config` and build the shared services
    pub fn new(
        store: S,
        config: IdentityConfig,
        notifier: Arc<dyn ProfileNotifier>,
    ) -> IdentityResult<Self> {
        config.validate()?;
        let hasher = Argon2Hasher::new(config.hasher, config.password_pepper.clone())?;
        let tokens = JwtTokenIssuer::from_config(&config);
        let state_guard = OAuthStateGuard::new(config.state_secret.clone(), config.state_ttl);
        let assertions = AssertionVerifier::from_config(&config);

        Ok(Self {
            store: Arc::new(store),
            config: Arc::new(config),
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
            state_guard: Arc::new(state_guard),
            assertions: Arc::new(assertions),
            decoder: Arc::new(ProviderDecoders),
            notifier,
        })
    }
}

impl<S> Clone for IdentityAppState<S>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            hasher: self.hasher.clone(),
            tokens: self.tokens.clone(),
            state_guard: self.state_guard.clone(),
            assertions: self.assertions.clone(),
            decoder: self.decoder.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S> FromRef<IdentityAppState<S>> for Arc<JwtTokenIssuer>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    fn from_ref(state: &IdentityAppState<S>) -> Self {
        state.tokens.clone()
    }
}

fn parse_account_id(raw: &str) -> IdentityResult<AccountId> {
    Ok(AccountId::parse_str(raw)?)
}

fn account_id_response(account_id: AccountId) -> Json<AccountIdResponse> {
    Json(AccountIdResponse {
        account_id: account_id.to_string(),
    })
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/identity/signup
pub async fn sign_up<S>(
    State(state): State<IdentityAppState<S>>,
    Json(req): Json<SignUpRequest>,
) -> IdentityResult<impl IntoResponse>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(
        state.store.clone(),
        state.hasher.clone(),
        state.notifier.clone(),
    );

    let account = use_case
        .execute(SignUpInput {
            email: req.email,
            username: req.username,
            password: req.password,
            // Self-service sign-up always gets the default role
            roles: Vec::new(),
        })
        .await?;

    let tokens = state.tokens.issue_pair(&account)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            account: AccountResponse::from(&account),
            tokens,
        }),
    ))
}

// ============================================================================
// Sign In
// ============================================================================

/// POST /api/identity/signin
///
/// Unknown account and wrong password produce the same 401.
pub async fn sign_in<S>(
    State(state): State<IdentityAppState<S>>,
    Json(req): Json<SignInRequest>,
) -> IdentityResult<Json<AuthResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(state.store.clone(), state.hasher.clone());

    let account = use_case
        .execute(SignInInput {
            identifier: req.identifier,
            password: req.password,
        })
        .await?
        .ok_or(IdentityError::InvalidCredentials)?;

    let tokens = state.tokens.issue_pair(&account)?;

    Ok(Json(AuthResponse {
        account: AccountResponse::from(&account),
        tokens,
    }))
}

// ============================================================================
// Federated Sign In
// ============================================================================

/// POST /api/identity/oauth/{provider}/state
pub async fn oauth_state<S>(
    State(state): State<IdentityAppState<S>>,
    Path(provider): Path<String>,
) -> IdentityResult<Json<OAuthStateResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let provider = Provider::federated(&provider)?;

    Ok(Json(OAuthStateResponse {
        state: state.state_guard.issue(provider),
    }))
}

/// POST /api/identity/oauth/{provider}/callback
///
/// The account is chosen from the verified assertion only.
pub async fn oauth_callback<S>(
    State(state): State<IdentityAppState<S>>,
    Path(provider): Path<String>,
    Json(req): Json<OAuthCallbackRequest>,
) -> IdentityResult<Json<FederatedSignInResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let bound = Provider::federated(&provider)?;
    state.state_guard.verify(&req.state, bound)?;
    let assertion = state.assertions.verify(&req.assertion, bound, &req.state)?;

    let use_case = FederatedSignInUseCase::new(
        state.store.clone(),
        state.decoder.clone(),
        state.notifier.clone(),
    );

    let output = use_case
        .execute(FederatedSignInInput::from(assertion))
        .await?;

    let tokens = state.tokens.issue_pair(&output.account)?;

    Ok(Json(FederatedSignInResponse {
        account: AccountResponse::from(&output.account),
        tokens,
        resolution: output.tier.as_str(),
    }))
}

// ============================================================================
// Tokens
// ============================================================================

/// POST /api/identity/token/refresh
pub async fn refresh_tokens<S>(
    State(state): State<IdentityAppState<S>>,
    Json(req): Json<RefreshRequest>,
) -> IdentityResult<Json<TokenPair>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let use_case = RefreshTokensUseCase::new(state.store.clone(), state.tokens.clone());
    let pair = use_case.execute(&req.refresh_token).await?;

    Ok(Json(pair))
}

// ============================================================================
// Account Maintenance (requires authentication)
// ============================================================================

/// PUT /api/identity/accounts/{id}/password
pub async fn change_password<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path(account_id): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> IdentityResult<Json<AccountIdResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let account_id = parse_account_id(&account_id)?;
    auth.ensure_self_or_admin(&account_id)?;

    let command = ChangePasswordCommand::new(account_id, req.current_password, req.new_password)?;
    let use_case = ChangePasswordUseCase::new(state.store.clone(), state.hasher.clone());

    Ok(account_id_response(use_case.execute(command).await?))
}

/// POST /api/identity/accounts/{id}/password
pub async fn initialize_password<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path(account_id): Path<String>,
    Json(req): Json<InitializePasswordRequest>,
) -> IdentityResult<impl IntoResponse>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let account_id = parse_account_id(&account_id)?;
    auth.ensure_self_or_admin(&account_id)?;

    let use_case = InitializeCredentialUseCase::new(state.store.clone(), state.hasher.clone());
    let account_id = use_case
        .execute(InitializeCredentialInput {
            account_id,
            password: req.new_password,
        })
        .await?;

    Ok((StatusCode::CREATED, account_id_response(account_id)))
}

/// PUT /api/identity/accounts/{id}/username
pub async fn update_username<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path(account_id): Path<String>,
    Json(req): Json<UpdateUsernameRequest>,
) -> IdentityResult<Json<AccountIdResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let account_id = parse_account_id(&account_id)?;
    auth.ensure_self_or_admin(&account_id)?;

    let use_case = UpdateUsernameUseCase::new(state.store.clone());
    let account_id = use_case
        .execute(UpdateUsernameInput {
            account_id,
            username: req.username,
        })
        .await?;

    Ok(account_id_response(account_id))
}

/// GET /api/identity/accounts/{id}/audit
pub async fn audit_trail<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path(account_id): Path<String>,
) -> IdentityResult<Json<Vec<AuditRecordResponse>>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let account_id = parse_account_id(&account_id)?;
    auth.ensure_self_or_admin(&account_id)?;

    let use_case = ListAuditTrailUseCase::new(state.store.clone());
    let records = use_case.execute(account_id).await?;

    Ok(Json(records.into_iter().map(AuditRecordResponse::from).collect()))
}

// ============================================================================
// Administration (requires ADMIN)
// ============================================================================

/// POST /api/identity/accounts/{id}/roles
pub async fn assign_role<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path(account_id): Path<String>,
    Json(req): Json<AssignRoleRequest>,
) -> IdentityResult<Json<AccountIdResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    auth.ensure_admin()?;
    let account_id = parse_account_id(&account_id)?;

    let use_case = ManageRolesUseCase::new(state.store.clone());
    let account_id = use_case
        .assign(RoleChangeInput {
            actor_id: auth.account_id()?,
            account_id,
            role: req.role,
        })
        .await?;

    Ok(account_id_response(account_id))
}

/// DELETE /api/identity/accounts/{id}/roles/{role}
pub async fn revoke_role<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path((account_id, role)): Path<(String, String)>,
) -> IdentityResult<Json<AccountIdResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    auth.ensure_admin()?;
    let account_id = parse_account_id(&account_id)?;

    let use_case = ManageRolesUseCase::new(state.store.clone());
    let account_id = use_case
        .revoke(RoleChangeInput {
            actor_id: auth.account_id()?,
            account_id,
            role,
        })
        .await?;

    Ok(account_id_response(account_id))
}

/// POST /api/identity/accounts/{id}/status
pub async fn change_status<S>(
    State(state): State<IdentityAppState<S>>,
    auth: Authenticated,
    Path(account_id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> IdentityResult<Json<AccountIdResponse>>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    auth.ensure_admin()?;
    let account_id = parse_account_id(&account_id)?;
    let status = AccountStatus::from_code(&req.status)?;

    let use_case = ChangeStatusUseCase::new(state.store.clone());
    let account_id = use_case
        .execute(auth.account_id()?, account_id, status)
        .await?;

    Ok(account_id_response(account_id))
}
