//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and bearer authentication.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::IdentityAppState;
pub use middleware::Authenticated;
pub use router::{identity_router, identity_router_generic, routes};
