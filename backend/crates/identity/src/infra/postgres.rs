//! PostgreSQL Store Implementation
//!
//! An account is written as a whole: root row, credential, roles, external
//! identities and the pending audit facts, in one transaction.
//!
//! Reads load the root and its children from one repeatable-read snapshot.
//! Writes to an existing account are guarded by its `version`: the root
//! `UPDATE` only matches the version the aggregate was loaded at, so a save
//! from a stale snapshot touches nothing and fails with `StaleAccount`.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, AuditId};
use platform::password::HashedPassword;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entity::{
    Account, AccountParts, AuditMetadata, AuditRecord, Credential, ExternalIdentity, RoleAssignment,
};
use crate::domain::repository::{AccountStore, AuditLog};
use crate::domain::value_object::{
    AccountStatus, AuditAction, Email, LoginIdentifier, Provider, Role, Username,
};
use crate::error::{IdentityError, IdentityResult};

const EMAIL_KEY: &str = "accounts_email_key";
const USERNAME_KEY: &str = "accounts_username_key";
const IDENTITY_KEY: &str = "external_identities_provider_subject_key";

const ACCOUNT_COLUMNS: &str = r#"
    a.account_id,
    a.email,
    a.username,
    a.account_status,
    a.last_sign_in_at,
    a.created_at,
    a.updated_at,
    a.version
"#;

/// PostgreSQL-backed account store and audit log
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn read_snapshot(&self) -> IdentityResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn find_one(&self, filter: &str, value: &str) -> IdentityResult<Option<Account>> {
        let mut tx = self.read_snapshot().await?;
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE {filter} = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&mut *tx)
            .await?;

        Self::finish(tx, row).await
    }

    /// Load the children of `row` inside the snapshot, then end it
    async fn finish(
        mut tx: Transaction<'static, Postgres>,
        row: Option<AccountRow>,
    ) -> IdentityResult<Option<Account>> {
        let account = match row {
            Some(row) => Some(Self::load(&mut tx, row).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(account)
    }

    /// Load the children of `row` and rebuild the aggregate
    async fn load(conn: &mut PgConnection, row: AccountRow) -> IdentityResult<Account> {
        let credential = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT account_id, password_hash, password_updated_at
            FROM credentials
            WHERE account_id = $1
            "#,
        )
        .bind(row.account_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(CredentialRow::into_credential)
        .transpose()?;

        let external_identities = sqlx::query_as::<_, ExternalIdentityRow>(
            r#"
            SELECT account_id, provider, provider_user_id, display_name, avatar_url, linked_at
            FROM external_identities
            WHERE account_id = $1
            ORDER BY linked_at
            "#,
        )
        .bind(row.account_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(ExternalIdentityRow::into_identity)
        .collect::<IdentityResult<Vec<_>>>()?;

        let roles = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT account_id, role_id, granted_at, granted_by
            FROM role_assignments
            WHERE account_id = $1
            ORDER BY role_id
            "#,
        )
        .bind(row.account_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(RoleAssignmentRow::into_assignment)
        .collect::<IdentityResult<Vec<_>>>()?;

        Account::restore(row.into_parts(credential, external_identities, roles)?)
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, account: &Account) -> IdentityResult<()> {
        let account_id = account.account_id().into_uuid();

        if account.version() == 0 {
            sqlx::query(
                r#"
                INSERT INTO accounts (
                    account_id,
                    email,
                    username,
                    username_canonical,
                    account_status,
                    last_sign_in_at,
                    created_at,
                    updated_at,
                    version
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
                "#,
            )
            .bind(account_id)
            .bind(account.email().as_str())
            .bind(account.username().original())
            .bind(account.username().canonical())
            .bind(account.status().id())
            .bind(account.last_sign_in_at())
            .bind(account.created_at())
            .bind(account.updated_at())
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?;
        } else {
            // Email is immutable once stored
            let affected = sqlx::query(
                r#"
                UPDATE accounts SET
                    username = $2,
                    username_canonical = $3,
                    account_status = $4,
                    last_sign_in_at = $5,
                    updated_at = $6,
                    version = version + 1
                WHERE account_id = $1 AND version = $7
                "#,
            )
            .bind(account_id)
            .bind(account.username().original())
            .bind(account.username().canonical())
            .bind(account.status().id())
            .bind(account.last_sign_in_at())
            .bind(account.updated_at())
            .bind(account.version())
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?
            .rows_affected();

            expect_one_row(affected, IdentityError::StaleAccount)?;
        }

        match account.credential() {
            Some(credential) => {
                sqlx::query(
                    r#"
                    INSERT INTO credentials (account_id, password_hash, password_updated_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (account_id) DO UPDATE SET
                        password_hash = EXCLUDED.password_hash,
                        password_updated_at = EXCLUDED.password_updated_at
                    "#,
                )
                .bind(account_id)
                .bind(credential.password_hash.as_phc_string())
                .bind(credential.password_updated_at)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM credentials WHERE account_id = $1")
                    .bind(account_id)
                    .execute(&mut **tx)
                    .await?;
            }
        }

        let role_ids: Vec<i16> = account.roles().iter().map(Role::id).collect();
        sqlx::query("DELETE FROM role_assignments WHERE account_id = $1 AND NOT (role_id = ANY($2))")
            .bind(account_id)
            .bind(&role_ids)
            .execute(&mut **tx)
            .await?;
        for assignment in account.role_assignments() {
            sqlx::query(
                r#"
                INSERT INTO role_assignments (account_id, role_id, granted_at, granted_by)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (account_id, role_id) DO NOTHING
                "#,
            )
            .bind(account_id)
            .bind(assignment.role.id())
            .bind(assignment.granted_at)
            .bind(assignment.granted_by.into_uuid())
            .execute(&mut **tx)
            .await?;
        }

        for identity in account.external_identities() {
            // Updates only rows owned by this account; a row owned by another
            // account leaves rows_affected at 0
            let affected = sqlx::query(
                r#"
                INSERT INTO external_identities (
                    account_id,
                    provider,
                    provider_user_id,
                    display_name,
                    avatar_url,
                    linked_at
                ) VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT ON CONSTRAINT external_identities_provider_subject_key DO UPDATE SET
                    display_name = EXCLUDED.display_name,
                    avatar_url = EXCLUDED.avatar_url
                WHERE external_identities.account_id = EXCLUDED.account_id
                "#,
            )
            .bind(account_id)
            .bind(identity.provider.code())
            .bind(&identity.provider_user_id)
            .bind(&identity.display_name)
            .bind(&identity.avatar_url)
            .bind(identity.linked_at)
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?
            .rows_affected();

            expect_one_row(affected, IdentityError::ExternalIdentityTaken)?;
        }

        for fact in account.pending_facts() {
            sqlx::query(
                r#"
                INSERT INTO audit_records (
                    audit_id,
                    actor_id,
                    account_id,
                    action,
                    metadata,
                    occurred_at
                ) VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(fact.audit_id.into_uuid())
            .bind(fact.actor_id.into_uuid())
            .bind(fact.account_id.into_uuid())
            .bind(fact.action.code())
            .bind(Json(&fact.metadata))
            .bind(fact.occurred_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

// ============================================================================
// Account Store Implementation
// ============================================================================

impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, account_id: &AccountId) -> IdentityResult<Option<Account>> {
        let mut tx = self.read_snapshot().await?;
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts a WHERE a.account_id = $1"
        ))
        .bind(account_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        Self::finish(tx, row).await
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Account>> {
        self.find_one("a.email", email.as_str()).await
    }

    async fn find_by_username(&self, username: &Username) -> IdentityResult<Option<Account>> {
        self.find_one("a.username_canonical", username.canonical()).await
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
        let mut tx = self.read_snapshot().await?;
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts a
            JOIN external_identities e ON e.account_id = a.account_id
            WHERE e.provider = $1 AND e.provider_user_id = $2
            "#
        ))
        .bind(provider.code())
        .bind(provider_user_id)
        .fetch_optional(&mut *tx)
        .await?;

        Self::finish(tx, row).await
    }

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn exists_by_username(&self, username: &Username) -> IdentityResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE username_canonical = $1)",
        )
        .bind(username.canonical())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn save(&self, account: &mut Account) -> IdentityResult<()> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on error rolls the transaction back
        Self::write(&mut tx, account).await?;

        tx.commit().await?;
        account.mark_persisted();

        Ok(())
    }
}

// ============================================================================
// Audit Log Implementation
// ============================================================================

impl AuditLog for PgAccountStore {
    async fn list_for_account(&self, account_id: &AccountId) -> IdentityResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT audit_id, actor_id, account_id, action, metadata, occurred_at
            FROM audit_records
            WHERE account_id = $1
            ORDER BY seq
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditRow::into_record).collect()
    }
}

/// A guarded statement that matched no row failed with `err`
fn expect_one_row(affected: u64, err: IdentityError) -> IdentityResult<()> {
    if affected == 0 {
        return Err(err);
    }
    Ok(())
}

/// Unique violations become the matching conflict
fn map_write_error(e: sqlx::Error) -> IdentityError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some(EMAIL_KEY) => return IdentityError::EmailTaken,
            Some(USERNAME_KEY) => return IdentityError::UsernameTaken,
            Some(IDENTITY_KEY) => return IdentityError::ExternalIdentityTaken,
            _ => {}
        }
    }
    IdentityError::Database(e)
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> IdentityError {
    IdentityError::Internal(format!("Invalid stored {what}: {value}"))
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    email: String,
    username: String,
    account_status: i16,
    last_sign_in_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl AccountRow {
    fn into_parts(
        self,
        credential: Option<Credential>,
        external_identities: Vec<ExternalIdentity>,
        roles: Vec<RoleAssignment>,
    ) -> IdentityResult<AccountParts> {
        let status = AccountStatus::from_id(self.account_status)
            .ok_or_else(|| corrupt("account_status", self.account_status))?;

        Ok(AccountParts {
            account_id: AccountId::from_uuid(self.account_id),
            email: Email::from_db(self.email),
            username: Username::from_db(self.username),
            status,
            credential,
            external_identities,
            roles,
            last_sign_in_at: self.last_sign_in_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    account_id: Uuid,
    password_hash: String,
    password_updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> IdentityResult<Credential> {
        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|e| corrupt("password_hash", e))?;

        Ok(Credential {
            account_id: AccountId::from_uuid(self.account_id),
            password_hash,
            password_updated_at: self.password_updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExternalIdentityRow {
    account_id: Uuid,
    provider: String,
    provider_user_id: String,
    display_name: Option<String>,
    avatar_url: Option<String>,
    linked_at: DateTime<Utc>,
}

impl ExternalIdentityRow {
    fn into_identity(self) -> IdentityResult<ExternalIdentity> {
        let provider = Provider::from_code(&self.provider).map_err(|_| corrupt("provider", &self.provider))?;

        Ok(ExternalIdentity {
            account_id: AccountId::from_uuid(self.account_id),
            provider,
            provider_user_id: self.provider_user_id,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            linked_at: self.linked_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoleAssignmentRow {
    account_id: Uuid,
    role_id: i16,
    granted_at: DateTime<Utc>,
    granted_by: Uuid,
}

impl RoleAssignmentRow {
    fn into_assignment(self) -> IdentityResult<RoleAssignment> {
        let role = Role::from_id(self.role_id).ok_or_else(|| corrupt("role_id", self.role_id))?;

        Ok(RoleAssignment {
            account_id: AccountId::from_uuid(self.account_id),
            role,
            granted_at: self.granted_at,
            granted_by: AccountId::from_uuid(self.granted_by),
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    audit_id: Uuid,
    actor_id: Uuid,
    account_id: Uuid,
    action: String,
    metadata: Json<AuditMetadata>,
    occurred_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_record(self) -> IdentityResult<AuditRecord> {
        let action = AuditAction::from_code(&self.action).map_err(|_| corrupt("action", &self.action))?;

        Ok(AuditRecord {
            audit_id: AuditId::from_uuid(self.audit_id),
            actor_id: AccountId::from_uuid(self.actor_id),
            account_id: AccountId::from_uuid(self.account_id),
            action,
            metadata: self.metadata.0,
            occurred_at: self.occurred_at,
        })
    }
}
