//! Member ledger repository.
//!
//! The four invite counters are only ever moved through the increment and
//! clamped-adjustment statements here, so stored counters stay non-negative
//! no matter what compensating deltas arrive.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use domain::models::JoinClass;

use crate::entities::MemberEntity;
use crate::metrics::QueryTimer;

const MEMBER_COLUMNS: &str = "group_id, member_id, joined_at, total_regular, total_custom, \
                              total_fake, total_leave, created_at, updated_at";

fn counter_column(class: JoinClass) -> &'static str {
    match class {
        JoinClass::Regular => "total_regular",
        JoinClass::Custom => "total_custom",
        JoinClass::Fake => "total_fake",
    }
}

/// Repository for member ledger operations.
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    /// Creates a new MemberRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a member, creating a zeroed row on first sight. Counters of an
    /// existing row are left untouched (they survive leave/rejoin).
    pub async fn get_or_create(
        &self,
        group_id: i64,
        member_id: i64,
        joined_at: DateTime<Utc>,
    ) -> Result<MemberEntity, sqlx::Error> {
        let timer = QueryTimer::new("get_or_create_member");
        let sql = format!(
            r#"
            INSERT INTO members (group_id, member_id, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, member_id) DO UPDATE SET updated_at = now()
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(group_id)
            .bind(member_id)
            .bind(joined_at)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Find a member by id.
    pub async fn find(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<Option<MemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_member");
        let sql = format!(
            r#"
            SELECT {MEMBER_COLUMNS}
            FROM members
            WHERE group_id = $1 AND member_id = $2
            "#
        );
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(group_id)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Credit one classified join to the inviter's matching counter.
    pub async fn apply_join_credit(
        &self,
        group_id: i64,
        inviter_id: i64,
        class: JoinClass,
    ) -> Result<MemberEntity, sqlx::Error> {
        let timer = QueryTimer::new("apply_join_credit");
        let column = counter_column(class);
        let sql = format!(
            r#"
            INSERT INTO members (group_id, member_id, joined_at, {column})
            VALUES ($1, $2, now(), 1)
            ON CONFLICT (group_id, member_id) DO UPDATE
            SET {column} = members.{column} + 1, updated_at = now()
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(group_id)
            .bind(inviter_id)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Record one leave penalty against the inviter. The original
    /// regular/custom counters stay untouched as historical record.
    pub async fn apply_leave_penalty(
        &self,
        group_id: i64,
        inviter_id: i64,
    ) -> Result<MemberEntity, sqlx::Error> {
        let timer = QueryTimer::new("apply_leave_penalty");
        let sql = format!(
            r#"
            INSERT INTO members (group_id, member_id, joined_at, total_leave)
            VALUES ($1, $2, now(), 1)
            ON CONFLICT (group_id, member_id) DO UPDATE
            SET total_leave = members.total_leave + 1, updated_at = now()
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(group_id)
            .bind(inviter_id)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Apply a compensating delta to one counter, clamped at zero.
    pub async fn adjust(
        &self,
        group_id: i64,
        member_id: i64,
        class: JoinClass,
        delta: i32,
    ) -> Result<Option<MemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("adjust_member_counter");
        let column = counter_column(class);
        let sql = format!(
            r#"
            UPDATE members
            SET {column} = GREATEST({column} + $3, 0), updated_at = now()
            WHERE group_id = $1 AND member_id = $2
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(group_id)
            .bind(member_id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Administrative clearing of accumulated leave penalties, clamped at
    /// zero.
    pub async fn clear_leave_penalty(
        &self,
        group_id: i64,
        member_id: i64,
        amount: i32,
    ) -> Result<Option<MemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("clear_leave_penalty");
        let sql = format!(
            r#"
            UPDATE members
            SET total_leave = GREATEST(total_leave - $3, 0), updated_at = now()
            WHERE group_id = $1 AND member_id = $2
            RETURNING {MEMBER_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(group_id)
            .bind(member_id)
            .bind(amount)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_column_mapping() {
        assert_eq!(counter_column(JoinClass::Regular), "total_regular");
        assert_eq!(counter_column(JoinClass::Custom), "total_custom");
        assert_eq!(counter_column(JoinClass::Fake), "total_fake");
    }

    // Ledger statements themselves require a database connection and are
    // covered by integration tests.
}
