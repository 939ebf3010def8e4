//! In-Memory Store
//!
//! Same uniqueness and version semantics as the PostgreSQL store, behind one
//! tokio mutex. A save is checked against every other account before anything
//! is applied, so a rejected save leaves no trace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use kernel::id::AccountId;
use tokio::sync::Mutex;

use crate::domain::entity::{Account, AuditRecord};
use crate::domain::repository::{AccountStore, AuditLog};
use crate::domain::value_object::{Email, LoginIdentifier, Provider, Username};
use crate::error::{IdentityError, IdentityResult};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    audit: Vec<AuditRecord>,
}

impl MemoryState {
    /// The stored version must still be the one `account` was loaded at
    fn check_version(&self, account: &Account) -> IdentityResult<()> {
        let stored = self
            .accounts
            .get(&account.account_id())
            .map_or(0, Account::version);
        if stored != account.version() {
            return Err(IdentityError::StaleAccount);
        }
        Ok(())
    }

    fn find(&self, predicate: impl Fn(&Account) -> bool) -> Option<Account> {
        self.accounts.values().find(|&a| predicate(a)).cloned()
    }

    /// Uniqueness against every *other* stored account
    fn check_unique(&self, account: &Account) -> IdentityResult<()> {
        let others = self
            .accounts
            .values()
            .filter(|a| a.account_id() != account.account_id());

        for other in others {
            if other.email() == account.email() {
                return Err(IdentityError::EmailTaken);
            }
            if other.username().canonical() == account.username().canonical() {
                return Err(IdentityError::UsernameTaken);
            }
            let shared_identity = account
                .external_identities()
                .iter()
                .any(|i| other.has_external_identity(i.provider, &i.provider_user_id));
            if shared_identity {
                return Err(IdentityError::ExternalIdentityTaken);
            }
        }
        Ok(())
    }
}

/// Account store for tests and single-process runs
#[derive(Default)]
pub struct InMemoryAccountStore {
    state: Mutex<MemoryState>,
    audit_unavailable: AtomicBool,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection: while set, every save fails as if the audit write failed
    pub fn set_audit_unavailable(&self, unavailable: bool) {
        self.audit_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn audit_count(&self) -> usize {
        self.state.lock().await.audit.len()
    }
}

impl AccountStore for InMemoryAccountStore {
    async fn find_by_id(&self, account_id: &AccountId) -> IdentityResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(account_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Account>> {
        Ok(self.state.lock().await.find(|a| a.email() == email))
    }

    async fn find_by_username(&self, username: &Username) -> IdentityResult<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .find(|a| a.username().canonical() == username.canonical()))
    }

    async fn find_by_login(&self, identifier: &LoginIdentifier) -> IdentityResult<Option<Account>> {
        match identifier {
            LoginIdentifier::Email(email) => self.find_by_email(email).await,
            LoginIdentifier::Username(username) => self.find_by_username(username).await,
        }
    }

    async fn find_by_external_identity(
        &self,
        provider: Provider,
        provider_user_id: &str,
    ) -> IdentityResult<Option<Account>> {
        Ok(self
            .state
            .lock()
            .await
            .find(|a| a.has_external_identity(provider, provider_user_id)))
    }

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn exists_by_username(&self, username: &Username) -> IdentityResult<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn save(&self, account: &mut Account) -> IdentityResult<()> {
        let mut state = self.state.lock().await;

        state.check_version(account)?;
        state.check_unique(account)?;
        if self.audit_unavailable.load(Ordering::SeqCst) && !account.pending_facts().is_empty() {
            tracing::error!(account_id = %account.account_id(), "Audit write failed");
            return Err(IdentityError::Internal("audit log unavailable".to_string()));
        }

        state.audit.extend_from_slice(account.pending_facts());
        account.mark_persisted();
        state.accounts.insert(account.account_id(), account.clone());
        Ok(())
    }
}

impl AuditLog for InMemoryAccountStore {
    async fn list_for_account(&self, account_id: &AccountId) -> IdentityResult<Vec<AuditRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .audit
            .iter()
            .filter(|r| &r.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::{Argon2Hasher, ClearTextPassword, CredentialHasher, HasherParams};

    use crate::domain::value_object::{AccountStatus, Role};

    fn local_account(email: &str, username: &str) -> Account {
        let hasher = Argon2Hasher::new(
            HasherParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            None,
        )
        .unwrap();
        let hash = hasher
            .encode(&ClearTextPassword::from_input("Abcdefg1!".to_string()))
            .unwrap();
        Account::register_local(
            Email::new(email).unwrap(),
            Username::new(username).unwrap(),
            hash,
            &[],
        )
    }

    #[tokio::test]
    async fn test_stale_snapshot_cannot_overwrite() {
        let store = InMemoryAccountStore::new();
        let mut account = local_account("u1@x.com", "user1");
        store.save(&mut account).await.unwrap();
        let id = account.account_id();

        let mut admin_copy = store.find_by_id(&id).await.unwrap().unwrap();
        let mut sign_in_copy = store.find_by_id(&id).await.unwrap().unwrap();

        admin_copy.suspend(id);
        store.save(&mut admin_copy).await.unwrap();

        sign_in_copy.record_sign_in(Provider::Local);
        assert!(matches!(
            store.save(&mut sign_in_copy).await,
            Err(IdentityError::StaleAccount)
        ));

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), AccountStatus::Suspended);
        assert!(stored.last_sign_in_at().is_none());
        assert_eq!(stored.version(), 2);
        // SIGNED_UP + ACCOUNT_SUSPENDED only
        assert_eq!(store.audit_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_role_grant_survives() {
        let store = InMemoryAccountStore::new();
        let mut account = local_account("u1@x.com", "user1");
        store.save(&mut account).await.unwrap();
        let id = account.account_id();

        let mut stale = store.find_by_id(&id).await.unwrap().unwrap();
        let mut grant = store.find_by_id(&id).await.unwrap().unwrap();
        grant.add_role(Role::Instructor, id);
        store.save(&mut grant).await.unwrap();

        stale.update_username(Username::new("renamed").unwrap());
        assert!(store.save(&mut stale).await.is_err());

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert!(stored.has_role(Role::Instructor));
        assert_eq!(stored.username().original(), "user1");
    }

    #[tokio::test]
    async fn test_saved_copy_can_save_again() {
        let store = InMemoryAccountStore::new();
        let mut account = local_account("u1@x.com", "user1");
        store.save(&mut account).await.unwrap();

        account.record_sign_in(Provider::Local);
        store.save(&mut account).await.unwrap();
        account.record_sign_in(Provider::Local);
        store.save(&mut account).await.unwrap();
        assert_eq!(account.version(), 3);
    }
}
