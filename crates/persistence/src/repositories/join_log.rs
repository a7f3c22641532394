//! Join log repository.
//!
//! Records which invite (if any) each processed join was attributed to.
//! Leave handling reads the latest attributed row to find the inviter to
//! penalize, and marks it penalized so one join funds at most one penalty.

use sqlx::PgPool;

use crate::entities::JoinLogEntity;
use crate::metrics::QueryTimer;

const JOIN_LOG_COLUMNS: &str =
    "id, group_id, member_id, inviter_id, code, join_class, sequence, penalized_at, created_at";

/// Repository for join log operations.
#[derive(Clone)]
pub struct JoinLogRepository {
    pool: PgPool,
}

impl JoinLogRepository {
    /// Creates a new JoinLogRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record one processed join. `inviter_id`/`code`/`join_class` are all
    /// None for unattributed joins.
    pub async fn record(
        &self,
        group_id: i64,
        member_id: i64,
        inviter_id: Option<i64>,
        code: Option<&str>,
        join_class: Option<&str>,
        sequence: i64,
    ) -> Result<JoinLogEntity, sqlx::Error> {
        let timer = QueryTimer::new("record_join");
        let sql = format!(
            r#"
            INSERT INTO join_log (group_id, member_id, inviter_id, code, join_class, sequence)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {JOIN_LOG_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, JoinLogEntity>(&sql)
            .bind(group_id)
            .bind(member_id)
            .bind(inviter_id)
            .bind(code)
            .bind(join_class)
            .bind(sequence)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// The member's most recent attributed join, if any.
    pub async fn latest_attributed(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<Option<JoinLogEntity>, sqlx::Error> {
        let timer = QueryTimer::new("latest_attributed_join");
        let sql = format!(
            r#"
            SELECT {JOIN_LOG_COLUMNS}
            FROM join_log
            WHERE group_id = $1 AND member_id = $2 AND inviter_id IS NOT NULL
            ORDER BY sequence DESC, id DESC
            LIMIT 1
            "#
        );
        let result = sqlx::query_as::<_, JoinLogEntity>(&sql)
            .bind(group_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Mark a join row as having funded a leave penalty. Returns false when
    /// the row was already penalized, so callers apply the penalty at most
    /// once per join.
    pub async fn mark_penalized(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_join_penalized");
        let result = sqlx::query(
            r#"
            UPDATE join_log
            SET penalized_at = now()
            WHERE id = $1 AND penalized_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    // Note: JoinLogRepository tests require a database connection and are
    // covered by integration tests.
}
