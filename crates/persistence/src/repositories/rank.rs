//! Rank ladder repository.
//!
//! A unique constraint on `(group_id, role_id)` plus revive-on-conflict
//! upsert keeps at most one live rank per role: re-creating a rank for a
//! role with a soft-deleted row updates and revives that row instead of
//! inserting a second one, including under concurrent upserts.

use sqlx::PgPool;

use crate::entities::RankEntity;
use crate::metrics::QueryTimer;

const RANK_COLUMNS: &str =
    "id, group_id, role_id, num_invites, description, created_at, updated_at, deleted_at";

/// Repository for rank ladder operations.
#[derive(Clone)]
pub struct RankRepository {
    pool: PgPool,
}

impl RankRepository {
    /// Creates a new RankRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the rank configured for a role, live or soft-deleted.
    pub async fn find_by_role(
        &self,
        group_id: i64,
        role_id: i64,
    ) -> Result<Option<RankEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_rank_by_role");
        let sql = format!(
            r#"
            SELECT {RANK_COLUMNS}
            FROM ranks
            WHERE group_id = $1 AND role_id = $2
            "#
        );
        let result = sqlx::query_as::<_, RankEntity>(&sql)
            .bind(group_id)
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Create or update the rank for a role, reviving a soft-deleted row.
    pub async fn upsert(
        &self,
        group_id: i64,
        role_id: i64,
        num_invites: i32,
        description: Option<&str>,
    ) -> Result<RankEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_rank");
        let sql = format!(
            r#"
            INSERT INTO ranks (group_id, role_id, num_invites, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (group_id, role_id) DO UPDATE
            SET num_invites = EXCLUDED.num_invites,
                description = EXCLUDED.description,
                deleted_at = NULL,
                updated_at = now()
            RETURNING {RANK_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, RankEntity>(&sql)
            .bind(group_id)
            .bind(role_id)
            .bind(num_invites)
            .bind(description)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// The live ladder, ascending by threshold.
    pub async fn list_live(&self, group_id: i64) -> Result<Vec<RankEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_live_ranks");
        let sql = format!(
            r#"
            SELECT {RANK_COLUMNS}
            FROM ranks
            WHERE group_id = $1 AND deleted_at IS NULL
            ORDER BY num_invites, role_id
            "#
        );
        let result = sqlx::query_as::<_, RankEntity>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Soft delete the rank for a role; history stays for audit.
    pub async fn soft_delete(&self, group_id: i64, role_id: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("soft_delete_rank");
        let result = sqlx::query(
            r#"
            UPDATE ranks
            SET deleted_at = now(), updated_at = now()
            WHERE group_id = $1 AND role_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    // Note: RankRepository tests require a database connection and are
    // covered by integration tests.
}
