//! Identity Router

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::application::notifier::ProfileNotifier;
use crate::domain::repository::{AccountStore, AuditLog};
use crate::error::IdentityResult;
use crate::infra::postgres::PgAccountStore;
use crate::presentation::handlers::{self, IdentityAppState};

/// Create the Identity router with the PostgreSQL store
pub fn identity_router(
    store: PgAccountStore,
    config: IdentityConfig,
    notifier: Arc<dyn ProfileNotifier>,
) -> IdentityResult<Router> {
    identity_router_generic(store, config, notifier)
}

/// Create a generic Identity router for any store implementation
pub fn identity_router_generic<S>(
    store: S,
    config: IdentityConfig,
    notifier: Arc<dyn ProfileNotifier>,
) -> IdentityResult<Router>
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    let state = IdentityAppState::new(store, config, notifier)?;
    Ok(routes(state))
}

/// Routes over an already built state
pub fn routes<S>(state: IdentityAppState<S>) -> Router
where
    S: AccountStore + AuditLog + Send + Sync + 'static,
{
    Router::new()
        .route("/signup", post(handlers::sign_up::<S>))
        .route("/signin", post(handlers::sign_in::<S>))
        .route("/oauth/{provider}/state", post(handlers::oauth_state::<S>))
        .route("/oauth/{provider}/callback", post(handlers::oauth_callback::<S>))
        .route("/token/refresh", post(handlers::refresh_tokens::<S>))
        .route(
            "/accounts/{id}/password",
            put(handlers::change_password::<S>).post(handlers::initialize_password::<S>),
        )
        .route("/accounts/{id}/username", put(handlers::update_username::<S>))
        .route("/accounts/{id}/roles", post(handlers::assign_role::<S>))
        .route("/accounts/{id}/roles/{role}", delete(handlers::revoke_role::<S>))
        .route("/accounts/{id}/status", post(handlers::change_status::<S>))
        .route("/accounts/{id}/audit", get(handlers::audit_trail::<S>))
        .with_state(state)
}
