//! Audit log entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the audit_log table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntity {
    pub id: i64,
    pub group_id: i64,
    pub action: String,
    pub actor_id: Option<i64>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
