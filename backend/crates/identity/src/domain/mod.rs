//! Domain Layer
//!
//! Contains entities, value objects, and the traits infrastructure implements.

pub mod entity;
pub mod federation;
pub mod repository;
pub mod token;
pub mod value_object;

// Re-exports
pub use entity::{Account, AuditRecord};
pub use federation::{FederatedProfile, ProfileDecoder, ProviderAttributes};
pub use repository::{AccountStore, AuditLog};
pub use token::{TokenIssuer, TokenPair};
