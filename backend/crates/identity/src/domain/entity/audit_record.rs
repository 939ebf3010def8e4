//! Audit Record Entity
//!
//! Append-only. Records are never updated or deleted and outlive the account's
//! active life.

use chrono::{DateTime, Utc};
use kernel::id::{AccountId, AuditId};
use std::collections::BTreeMap;

use crate::domain::value_object::AuditAction;

pub type AuditMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    /// Who performed the action (the account itself for self-service actions)
    pub actor_id: AccountId,
    /// Whose identity was affected
    pub account_id: AccountId,
    pub action: AuditAction,
    pub metadata: AuditMetadata,
    pub occurred_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        actor_id: AccountId,
        account_id: AccountId,
        action: AuditAction,
        metadata: AuditMetadata,
    ) -> Self {
        Self {
            audit_id: AuditId::new(),
            actor_id,
            account_id,
            action,
            metadata,
            occurred_at: Utc::now(),
        }
    }
}

/// Build audit metadata from key/value pairs
pub fn metadata<const N: usize>(pairs: [(&str, &str); N]) -> AuditMetadata {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
