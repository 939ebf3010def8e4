//! Infrastructure Layer
//!
//! Store implementations, tokens, federation assertions and provider decoding.

pub mod assertion;
pub mod jwt;
pub mod memory;
pub mod postgres;
pub mod provider;

pub use assertion::{AssertionVerifier, FederationAssertion};
pub use jwt::{AccessClaims, JwtTokenIssuer, RefreshClaims};
pub use memory::InMemoryAccountStore;
pub use postgres::PgAccountStore;
pub use provider::ProviderDecoders;
