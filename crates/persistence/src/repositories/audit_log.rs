//! Audit log repository.

use sqlx::PgPool;

use domain::models::AuditEntry;

use crate::entities::AuditLogEntity;
use crate::metrics::QueryTimer;

/// Repository for audit log operations.
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Creates a new AuditLogRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist one structured audit event.
    pub async fn record(&self, entry: &AuditEntry) -> Result<AuditLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("record_audit_entry");
        let result = sqlx::query_as::<_, AuditLogEntity>(
            r#"
            INSERT INTO audit_log (group_id, action, actor_id, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, group_id, action, actor_id, payload, created_at
            "#,
        )
        .bind(entry.group_id)
        .bind(entry.action.as_str())
        .bind(entry.actor_id)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// The most recent audit entries for a group.
    pub async fn list_recent(
        &self,
        group_id: i64,
        limit: i64,
    ) -> Result<Vec<AuditLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_recent_audit_entries");
        let result = sqlx::query_as::<_, AuditLogEntity>(
            r#"
            SELECT id, group_id, action, actor_id, payload, created_at
            FROM audit_log
            WHERE group_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
