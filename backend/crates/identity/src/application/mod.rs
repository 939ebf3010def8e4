//! Application Layer
//!
//! Use cases and application services.

pub mod audit_trail;
pub mod change_password;
pub mod change_status;
pub mod config;
pub mod federated_sign_in;
pub mod initialize_credential;
pub mod manage_roles;
pub mod notifier;
pub mod oauth_state;
pub mod refresh_tokens;
pub(crate) mod retry;
pub mod sign_in;
pub mod sign_up;
pub mod update_username;

// Re-exports
pub use audit_trail::ListAuditTrailUseCase;
pub use change_password::{ChangePasswordCommand, ChangePasswordUseCase};
pub use change_status::ChangeStatusUseCase;
pub use config::IdentityConfig;
pub use federated_sign_in::{
    FederatedSignInInput, FederatedSignInOutput, FederatedSignInUseCase, ResolutionTier,
};
pub use initialize_credential::{InitializeCredentialInput, InitializeCredentialUseCase};
pub use manage_roles::{ManageRolesUseCase, RoleChangeInput};
pub use notifier::{ChannelProfileNotifier, ProfileNeeded, ProfileNotifier, TracingProfileNotifier};
pub use oauth_state::OAuthStateGuard;
pub use refresh_tokens::RefreshTokensUseCase;
pub use sign_in::{SignInInput, SignInUseCase};
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use update_username::{UpdateUsernameInput, UpdateUsernameUseCase};
