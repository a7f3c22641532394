//! Join log entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the join_log table. One row per processed join;
/// the ledger delta a leave event applies is looked up here.
#[derive(Debug, Clone, FromRow)]
pub struct JoinLogEntity {
    pub id: i64,
    pub group_id: i64,
    pub member_id: i64,
    pub inviter_id: Option<i64>,
    pub code: Option<String>,
    pub join_class: Option<String>,
    pub sequence: i64,
    pub penalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
