//! Identity (Account Resolution) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Account aggregate, value objects, store traits
//! - `application/` - Use cases (the account resolution engine)
//! - `infra/` - PostgreSQL and in-memory stores, JWT issuer, federation assertions, provider decoders
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Local sign-up/sign-in by email or username + password
//! - Federated sign-in (Google, GitHub) resolving to exactly one account:
//!   existing identity, then email merge, then provisioning
//! - Fixed role set (STUDENT, INSTRUCTOR, ADMIN)
//! - Append-only audit trail written with the aggregate
//! - Stateless HS256 access/refresh tokens
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper
//! - Sign-in never reveals whether an account exists
//! - OAuth callbacks carry an HMAC-signed, expiring, provider-bound state and a
//!   broker-signed assertion bound to that state
//! - Emails merge into an existing account only when the provider verified them
//! - Store uniqueness constraints settle concurrent sign-ups and first logins
//! - Versioned saves reject writes from stale snapshots

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult};
pub use infra::memory::InMemoryAccountStore;
pub use infra::postgres::PgAccountStore;
pub use presentation::router::identity_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::domain::repository::{AccountStore, AuditLog};
    pub use crate::infra::memory::InMemoryAccountStore;
    pub use crate::infra::postgres::PgAccountStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
