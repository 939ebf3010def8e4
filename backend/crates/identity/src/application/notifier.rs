//! Profile Notification
//!
//! The profile context owns display data. The identity engine only tells it
//! that a new account needs a profile.

use kernel::id::AccountId;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::entity::Account;
use crate::domain::value_object::Role;

/// "Profile needed" notification payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileNeeded {
    pub account_id: AccountId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub roles: Vec<Role>,
}

impl ProfileNeeded {
    pub fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.account_id(),
            username: account.username().original().to_string(),
            display_name: account.display_name().map(str::to_string),
            avatar_url: account.avatar_url().map(str::to_string),
            roles: account.roles(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("profile notification receiver is gone")]
    ReceiverClosed,
}

/// Sink for "profile needed" notifications
///
/// Called only after the account is committed. A delivery failure is logged by
/// the caller and never undoes the account.
pub trait ProfileNotifier: Send + Sync {
    fn profile_needed(&self, event: ProfileNeeded) -> Result<(), NotifyError>;
}

/// Emits the notification as a structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProfileNotifier;

impl ProfileNotifier for TracingProfileNotifier {
    fn profile_needed(&self, event: ProfileNeeded) -> Result<(), NotifyError> {
        let roles: Vec<&str> = event.roles.iter().map(Role::code).collect();
        tracing::info!(
            account_id = %event.account_id,
            username = %event.username,
            display_name = event.display_name.as_deref().unwrap_or(""),
            roles = ?roles,
            "Profile needed"
        );
        Ok(())
    }
}

/// Forwards notifications to an in-process consumer
#[derive(Debug, Clone)]
pub struct ChannelProfileNotifier {
    tx: mpsc::UnboundedSender<ProfileNeeded>,
}

impl ChannelProfileNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProfileNeeded>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProfileNotifier for ChannelProfileNotifier {
    fn profile_needed(&self, event: ProfileNeeded) -> Result<(), NotifyError> {
        self.tx.send(event).map_err(|_| NotifyError::ReceiverClosed)
    }
}

/// Deliver a notification for a freshly committed account, logging failures
pub(crate) fn notify_profile_needed(notifier: &dyn ProfileNotifier, account: &Account) {
    if let Err(e) = notifier.profile_needed(ProfileNeeded::for_account(account)) {
        tracing::warn!(
            account_id = %account.account_id(),
            error = %e,
            "Profile notification not delivered"
        );
    }
}
