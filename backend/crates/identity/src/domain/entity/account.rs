//! Account Aggregate
//!
//! The account owns its credential, its linked external identities and its
//! role grants. Every mutation goes through this type so the invariants hold:
//!
//! - an account always has at least one way to authenticate (a credential or
//!   an external identity)
//! - an account always holds at least one role
//! - an external identity appears at most once on an account
//!
//! Identity-affecting mutations append *pending facts* (audit records) which the
//! store writes in the same transaction as the aggregate.
//!
//! `version` counts committed saves. A store accepts a save only when its
//! stored version still equals the one the aggregate was loaded at; a new
//! account is at version 0.

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use platform::password::HashedPassword;

use crate::domain::entity::audit_record::{AuditMetadata, AuditRecord, metadata};
use crate::domain::entity::credential::Credential;
use crate::domain::entity::external_identity::ExternalIdentity;
use crate::domain::entity::role_assignment::RoleAssignment;
use crate::domain::value_object::{AccountStatus, AuditAction, Email, Provider, Role, Username};
use crate::error::{IdentityError, IdentityResult};

/// External identity about to be attached to an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExternalIdentity {
    pub provider: Provider,
    pub provider_user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Stored state of an account, as read back by a store
#[derive(Debug, Clone)]
pub struct AccountParts {
    pub account_id: AccountId,
    pub email: Email,
    pub username: Username,
    pub status: AccountStatus,
    pub credential: Option<Credential>,
    pub external_identities: Vec<ExternalIdentity>,
    pub roles: Vec<RoleAssignment>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct Account {
    account_id: AccountId,
    email: Email,
    username: Username,
    status: AccountStatus,
    credential: Option<Credential>,
    external_identities: Vec<ExternalIdentity>,
    roles: Vec<RoleAssignment>,
    last_sign_in_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
    pending_facts: Vec<AuditRecord>,
}

impl Account {
    // ========================================================================
    // Construction
    // ========================================================================

    /// New ACTIVE account with a local credential. Records `SIGNED_UP`.
    pub fn register_local(
        email: Email,
        username: Username,
        password_hash: HashedPassword,
        roles: &[Role],
    ) -> Self {
        let account_id = AccountId::new();
        let mut account = Self::blank(account_id, email, username, roles);
        account.credential = Some(Credential::new(account_id, password_hash));
        account.record(
            account_id,
            AuditAction::SignedUp,
            metadata([("method", Provider::Local.code())]),
        );
        account
    }

    /// New ACTIVE account owned by an external identity.
    /// Records `SIGNED_UP` then `OAUTH_LINKED`.
    pub fn provision_federated(
        email: Email,
        username: Username,
        identity: NewExternalIdentity,
        roles: &[Role],
    ) -> Self {
        let account_id = AccountId::new();
        let mut account = Self::blank(account_id, email, username, roles);
        account.record(
            account_id,
            AuditAction::SignedUp,
            metadata([("method", identity.provider.code())]),
        );
        account.attach_identity(identity);
        account
    }

    /// Rebuild an account from stored parts
    ///
    /// Stored data that breaks an invariant is reported as an internal error.
    pub fn restore(parts: AccountParts) -> IdentityResult<Self> {
        if parts.credential.is_none() && parts.external_identities.is_empty() {
            return Err(IdentityError::Internal(format!(
                "account {} has no authentication path",
                parts.account_id
            )));
        }
        if parts.roles.is_empty() {
            return Err(IdentityError::Internal(format!(
                "account {} has no role",
                parts.account_id
            )));
        }

        Ok(Self {
            account_id: parts.account_id,
            email: parts.email,
            username: parts.username,
            status: parts.status,
            credential: parts.credential,
            external_identities: parts.external_identities,
            roles: parts.roles,
            last_sign_in_at: parts.last_sign_in_at,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            version: parts.version,
            pending_facts: Vec::new(),
        })
    }

    fn blank(account_id: AccountId, email: Email, username: Username, roles: &[Role]) -> Self {
        let now = Utc::now();
        let mut assignments: Vec<RoleAssignment> = Vec::with_capacity(roles.len().max(1));
        for &role in roles {
            if !assignments.iter().any(|a| a.role == role) {
                assignments.push(RoleAssignment::new(account_id, role, account_id));
            }
        }
        if assignments.is_empty() {
            assignments.push(RoleAssignment::new(account_id, Role::default(), account_id));
        }

        Self {
            account_id,
            email,
            username,
            status: AccountStatus::Active,
            credential: None,
            external_identities: Vec::new(),
            roles: assignments,
            last_sign_in_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
            pending_facts: Vec::new(),
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn record_sign_in(&mut self, method: Provider) {
        let now = Utc::now();
        self.last_sign_in_at = Some(now);
        self.updated_at = now;
        self.record(
            self.account_id,
            AuditAction::SignedIn,
            metadata([("method", method.code())]),
        );
    }

    pub fn change_password(&mut self, new_hash: HashedPassword) -> IdentityResult<()> {
        let credential = self
            .credential
            .as_mut()
            .ok_or(IdentityError::NoLocalCredential)?;
        credential.replace_hash(new_hash);
        self.touch();
        self.record(self.account_id, AuditAction::PasswordChanged, AuditMetadata::new());
        Ok(())
    }

    /// Give a federated-only account a local password
    pub fn initialize_credential(&mut self, hash: HashedPassword) -> IdentityResult<()> {
        if self.credential.is_some() {
            return Err(IdentityError::CredentialAlreadySet);
        }
        self.credential = Some(Credential::new(self.account_id, hash));
        self.touch();
        self.record(
            self.account_id,
            AuditAction::PasswordChanged,
            metadata([("initialized", "true")]),
        );
        Ok(())
    }

    /// Returns `false` when the canonical form is unchanged (no fact recorded)
    pub fn update_username(&mut self, new: Username) -> bool {
        if new.canonical() == self.username.canonical() {
            return false;
        }
        let old = std::mem::replace(&mut self.username, new);
        self.touch();
        let meta = metadata([("old", old.original()), ("new", self.username.original())]);
        self.record(self.account_id, AuditAction::UsernameChanged, meta);
        true
    }

    /// Attach an external identity. Returns `false` if it is already on this account.
    ///
    /// Global uniqueness is checked by the caller against the store and enforced
    /// again by the store on save.
    pub fn link_external_identity(&mut self, identity: NewExternalIdentity) -> bool {
        if self.has_external_identity(identity.provider, &identity.provider_user_id) {
            return false;
        }
        self.attach_identity(identity);
        self.touch();
        true
    }

    fn attach_identity(&mut self, identity: NewExternalIdentity) {
        let meta = metadata([
            ("provider", identity.provider.code()),
            ("provider_user_id", identity.provider_user_id.as_str()),
        ]);
        self.external_identities.push(ExternalIdentity::new(
            self.account_id,
            identity.provider,
            identity.provider_user_id,
            identity.display_name,
            identity.avatar_url,
        ));
        self.record(self.account_id, AuditAction::OauthLinked, meta);
    }

    /// Idempotent. Returns `true` when the role set changed.
    pub fn add_role(&mut self, role: Role, granted_by: AccountId) -> bool {
        if self.has_role(role) {
            return false;
        }
        self.roles
            .push(RoleAssignment::new(self.account_id, role, granted_by));
        self.touch();
        self.record(granted_by, AuditAction::RoleAssigned, metadata([("role", role.code())]));
        true
    }

    /// Idempotent. Removing the last remaining role is rejected.
    pub fn remove_role(&mut self, role: Role, actor: AccountId) -> IdentityResult<bool> {
        if !self.has_role(role) {
            return Ok(false);
        }
        if self.roles.len() == 1 {
            return Err(IdentityError::LastRoleRemoval);
        }
        self.roles.retain(|a| a.role != role);
        self.touch();
        self.record(actor, AuditAction::RoleRevoked, metadata([("role", role.code())]));
        Ok(true)
    }

    pub fn deactivate(&mut self, actor: AccountId) -> bool {
        self.transition(AccountStatus::Deactivated, actor, AuditAction::AccountDeactivated)
    }

    pub fn suspend(&mut self, actor: AccountId) -> bool {
        self.transition(AccountStatus::Suspended, actor, AuditAction::AccountSuspended)
    }

    pub fn reactivate(&mut self, actor: AccountId) -> bool {
        self.transition(AccountStatus::Active, actor, AuditAction::AccountReactivated)
    }

    /// Move to `to`. A transition to the current status is a no-op.
    pub fn transition_to(&mut self, to: AccountStatus, actor: AccountId) -> bool {
        match to {
            AccountStatus::Active => self.reactivate(actor),
            AccountStatus::Deactivated => self.deactivate(actor),
            AccountStatus::Suspended => self.suspend(actor),
        }
    }

    fn transition(&mut self, to: AccountStatus, actor: AccountId, action: AuditAction) -> bool {
        if self.status == to {
            return false;
        }
        let from = self.status;
        self.status = to;
        self.touch();
        self.record(actor, action, metadata([("from", from.code()), ("to", to.code())]));
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ========================================================================
    // Audit facts
    // ========================================================================

    /// Append a pending audit fact about this account
    pub fn record(&mut self, actor: AccountId, action: AuditAction, metadata: AuditMetadata) {
        self.pending_facts
            .push(AuditRecord::new(actor, self.account_id, action, metadata));
    }

    /// Facts recorded since the last successful save
    pub fn pending_facts(&self) -> &[AuditRecord] {
        &self.pending_facts
    }

    /// Called by stores after the transaction committed
    pub fn mark_persisted(&mut self) {
        self.pending_facts.clear();
        self.version += 1;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn external_identities(&self) -> &[ExternalIdentity] {
        &self.external_identities
    }

    pub fn role_assignments(&self) -> &[RoleAssignment] {
        &self.roles
    }

    pub fn roles(&self) -> Vec<Role> {
        self.roles.iter().map(|a| a.role).collect()
    }

    pub fn last_sign_in_at(&self) -> Option<DateTime<Utc>> {
        self.last_sign_in_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Version this snapshot was loaded at (0 = never saved)
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn has_local_credentials(&self) -> bool {
        self.credential.is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|a| a.role == role)
    }

    pub fn has_external_identity(&self, provider: Provider, provider_user_id: &str) -> bool {
        self.external_identities
            .iter()
            .any(|i| i.matches(provider, provider_user_id))
    }

    /// Display name from the most recently linked identity, if any
    pub fn display_name(&self) -> Option<&str> {
        self.external_identities
            .iter()
            .rev()
            .find_map(|i| i.display_name.as_deref())
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.external_identities
            .iter()
            .rev()
            .find_map(|i| i.avatar_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::{Argon2Hasher, ClearTextPassword, CredentialHasher, HasherParams};

    fn hash(password: &str) -> HashedPassword {
        let hasher = Argon2Hasher::new(
            HasherParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            None,
        )
        .unwrap();
        hasher
            .encode(&ClearTextPassword::from_input(password.to_string()))
            .unwrap()
    }

    fn local_account() -> Account {
        Account::register_local(
            Email::new("u1@x.com").unwrap(),
            Username::new("user1").unwrap(),
            hash("Abcdefg1!"),
            &[],
        )
    }

    fn google_identity(subject: &str) -> NewExternalIdentity {
        NewExternalIdentity {
            provider: Provider::Google,
            provider_user_id: subject.to_string(),
            display_name: Some("New User".to_string()),
            avatar_url: None,
        }
    }

    fn actions(account: &Account) -> Vec<AuditAction> {
        account.pending_facts().iter().map(|f| f.action).collect()
    }

    #[test]
    fn test_register_local_shape() {
        let account = local_account();
        assert!(account.is_active());
        assert!(account.has_local_credentials());
        assert!(account.external_identities().is_empty());
        assert_eq!(account.roles(), vec![Role::Student]);
        assert_eq!(actions(&account), vec![AuditAction::SignedUp]);

        let fact = &account.pending_facts()[0];
        assert_eq!(fact.actor_id, account.account_id());
        assert_eq!(fact.account_id, account.account_id());
        // Children carry the client-generated id
        assert_eq!(
            account.credential().unwrap().account_id,
            account.account_id()
        );
        assert_eq!(account.role_assignments()[0].account_id, account.account_id());
    }

    #[test]
    fn test_roles_are_deduplicated() {
        let account = Account::register_local(
            Email::new("a@x.com").unwrap(),
            Username::new("alice").unwrap(),
            hash("Abcdefg1!"),
            &[Role::Admin, Role::Admin, Role::Instructor],
        );
        assert_eq!(account.roles(), vec![Role::Admin, Role::Instructor]);
    }

    #[test]
    fn test_provision_federated_shape() {
        let account = Account::provision_federated(
            Email::new("new@x.com").unwrap(),
            Username::generate(),
            google_identity("g-123"),
            &[],
        );
        assert!(!account.has_local_credentials());
        assert!(account.has_external_identity(Provider::Google, "g-123"));
        assert_eq!(
            actions(&account),
            vec![AuditAction::SignedUp, AuditAction::OauthLinked]
        );
        assert_eq!(account.display_name(), Some("New User"));
    }

    #[test]
    fn test_restore_rejects_account_without_auth_path() {
        let account = local_account();
        let mut parts = AccountParts {
            account_id: account.account_id(),
            email: account.email().clone(),
            username: account.username().clone(),
            status: account.status(),
            credential: None,
            external_identities: Vec::new(),
            roles: account.role_assignments().to_vec(),
            last_sign_in_at: None,
            created_at: account.created_at(),
            updated_at: account.updated_at(),
            version: 3,
        };
        assert!(Account::restore(parts.clone()).is_err());

        parts.credential = account.credential().cloned();
        let restored = Account::restore(parts.clone()).unwrap();
        assert!(restored.pending_facts().is_empty());
        assert_eq!(restored.version(), 3);

        parts.roles.clear();
        assert!(Account::restore(parts).is_err());
    }

    #[test]
    fn test_change_password_requires_credential() {
        let mut federated = Account::provision_federated(
            Email::new("f@x.com").unwrap(),
            Username::generate(),
            google_identity("g-1"),
            &[],
        );
        assert!(matches!(
            federated.change_password(hash("Other1234!")),
            Err(IdentityError::NoLocalCredential)
        ));

        let mut account = local_account();
        account.mark_persisted();
        account.change_password(hash("Other1234!")).unwrap();
        assert_eq!(actions(&account), vec![AuditAction::PasswordChanged]);
    }

    #[test]
    fn test_initialize_credential_once() {
        let mut account = Account::provision_federated(
            Email::new("f@x.com").unwrap(),
            Username::generate(),
            google_identity("g-1"),
            &[],
        );
        account.mark_persisted();
        account.initialize_credential(hash("Abcdefg1!")).unwrap();
        assert!(account.has_local_credentials());
        assert_eq!(
            account.pending_facts()[0].metadata.get("initialized").map(String::as_str),
            Some("true")
        );
        assert!(matches!(
            account.initialize_credential(hash("Abcdefg1!")),
            Err(IdentityError::CredentialAlreadySet)
        ));
    }

    #[test]
    fn test_update_username_records_old_and_new() {
        let mut account = local_account();
        account.mark_persisted();

        assert!(!account.update_username(Username::new("USER1").unwrap()));
        assert!(account.pending_facts().is_empty());

        assert!(account.update_username(Username::new("Renamed").unwrap()));
        let fact = &account.pending_facts()[0];
        assert_eq!(fact.action, AuditAction::UsernameChanged);
        assert_eq!(fact.metadata["old"], "user1");
        assert_eq!(fact.metadata["new"], "Renamed");
    }

    #[test]
    fn test_link_is_noop_when_already_linked() {
        let mut account = local_account();
        account.mark_persisted();
        assert!(account.link_external_identity(google_identity("g-9")));
        assert!(!account.link_external_identity(google_identity("g-9")));
        assert_eq!(account.external_identities().len(), 1);
        assert_eq!(actions(&account), vec![AuditAction::OauthLinked]);
    }

    #[test]
    fn test_roles_keep_at_least_one() {
        let admin = AccountId::new();
        let mut account = local_account();
        account.mark_persisted();

        assert!(account.add_role(Role::Instructor, admin));
        assert!(!account.add_role(Role::Instructor, admin));
        assert!(account.remove_role(Role::Student, admin).unwrap());
        assert!(!account.remove_role(Role::Student, admin).unwrap());
        assert!(matches!(
            account.remove_role(Role::Instructor, admin),
            Err(IdentityError::LastRoleRemoval)
        ));
        assert_eq!(
            actions(&account),
            vec![AuditAction::RoleAssigned, AuditAction::RoleRevoked]
        );
        assert!(account.pending_facts().iter().all(|f| f.actor_id == admin));
    }

    #[test]
    fn test_status_transitions() {
        let admin = AccountId::new();
        let mut account = local_account();
        account.mark_persisted();

        assert!(account.suspend(admin));
        assert!(!account.is_active());
        assert!(!account.suspend(admin));
        assert!(account.reactivate(admin));
        assert!(account.deactivate(admin));
        assert!(account.transition_to(AccountStatus::Active, admin));
        assert_eq!(
            actions(&account),
            vec![
                AuditAction::AccountSuspended,
                AuditAction::AccountReactivated,
                AuditAction::AccountDeactivated,
                AuditAction::AccountReactivated,
            ]
        );
        assert_eq!(account.pending_facts()[0].metadata["from"], "ACTIVE");
    }

    #[test]
    fn test_version_counts_saves() {
        let mut account = local_account();
        assert_eq!(account.version(), 0);
        account.mark_persisted();
        account.record_sign_in(Provider::Local);
        account.mark_persisted();
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn test_record_sign_in() {
        let mut account = local_account();
        account.mark_persisted();
        assert!(account.last_sign_in_at().is_none());
        account.record_sign_in(Provider::Local);
        assert!(account.last_sign_in_at().is_some());
        assert_eq!(actions(&account), vec![AuditAction::SignedIn]);
    }
}
