use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::domain::value_object::Role;

/// Grant of one role to one account. `(account_id, role)` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub account_id: AccountId,
    pub role: Role,
    pub granted_at: DateTime<Utc>,
    pub granted_by: AccountId,
}

impl RoleAssignment {
    pub fn new(account_id: AccountId, role: Role, granted_by: AccountId) -> Self {
        Self {
            account_id,
            role,
            granted_at: Utc::now(),
            granted_by,
        }
    }
}
