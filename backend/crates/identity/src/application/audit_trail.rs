//! List Audit Trail Use Case

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::entity::AuditRecord;
use crate::domain::repository::AuditLog;
use crate::error::IdentityResult;

pub struct ListAuditTrailUseCase<A>
where
    A: AuditLog,
{
    audit_log: Arc<A>,
}

impl<A> ListAuditTrailUseCase<A>
where
    A: AuditLog,
{
    pub fn new(audit_log: Arc<A>) -> Self {
        Self { audit_log }
    }

    /// Oldest first. The trail outlives deactivation, so no status check.
    pub async fn execute(&self, account_id: AccountId) -> IdentityResult<Vec<AuditRecord>> {
        self.audit_log.list_for_account(&account_id).await
    }
}
