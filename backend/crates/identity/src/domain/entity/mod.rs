//! Entities

pub mod account;
pub mod audit_record;
pub mod credential;
pub mod external_identity;
pub mod role_assignment;

pub use account::{Account, AccountParts, NewExternalIdentity};
pub use audit_record::{AuditMetadata, AuditRecord};
pub use credential::Credential;
pub use external_identity::ExternalIdentity;
pub use role_assignment::RoleAssignment;
