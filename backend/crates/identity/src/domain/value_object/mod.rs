//! Value Objects

pub mod account_status;
pub mod audit_action;
pub mod email;
pub mod login_identifier;
pub mod provider;
pub mod role;
pub mod username;

pub use account_status::AccountStatus;
pub use audit_action::AuditAction;
pub use email::Email;
pub use login_identifier::LoginIdentifier;
pub use provider::Provider;
pub use role::Role;
pub use username::{Username, UsernameError};
