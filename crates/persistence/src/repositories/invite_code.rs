//! Invite code registry repository.
//!
//! The only source of truth for "which code changed". Use-counts advance
//! through single-statement compare-and-swap so two concurrent join
//! resolutions cannot both claim the same increment, and upserts never
//! resurrect a revoked code.

use sqlx::PgPool;

use domain::models::PlatformInvite;

use crate::entities::InviteCodeEntity;
use crate::metrics::QueryTimer;

/// Repository for invite-code registry operations.
#[derive(Clone)]
pub struct InviteCodeRepository {
    pool: PgPool,
}

impl InviteCodeRepository {
    /// Creates a new InviteCodeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert of a platform-observed invite. Refreshes
    /// `uses` (monotonically), `max_uses` and `max_age_secs`; a revoked
    /// code stays revoked.
    pub async fn upsert_observed(
        &self,
        group_id: i64,
        invite: &PlatformInvite,
    ) -> Result<InviteCodeEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_invite_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            INSERT INTO invite_codes
                (group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs, is_temporary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (group_id, code) DO UPDATE
            SET uses = GREATEST(invite_codes.uses, EXCLUDED.uses),
                max_uses = EXCLUDED.max_uses,
                max_age_secs = EXCLUDED.max_age_secs,
                updated_at = now()
            RETURNING group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs,
                      is_temporary, is_vanity, is_widget, is_custom, cleared_amount,
                      created_at, updated_at, revoked_at
            "#,
        )
        .bind(group_id)
        .bind(&invite.code)
        .bind(invite.channel_id)
        .bind(invite.inviter_id)
        .bind(invite.uses)
        .bind(invite.max_uses)
        .bind(invite.max_age_secs)
        .bind(invite.temporary)
        .bind(invite.created_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a code in any lifecycle state. Unknown codes return None.
    pub async fn find(
        &self,
        group_id: i64,
        code: &str,
    ) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_invite_code");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            SELECT group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs,
                   is_temporary, is_vanity, is_widget, is_custom, cleared_amount,
                   created_at, updated_at, revoked_at
            FROM invite_codes
            WHERE group_id = $1 AND code = $2
            "#,
        )
        .bind(group_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All codes for a group, revoked included (the resolver diffs against
    /// the full history to avoid re-crediting revoked codes).
    pub async fn list(&self, group_id: i64) -> Result<Vec<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_invite_codes");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            SELECT group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs,
                   is_temporary, is_vanity, is_widget, is_custom, cleared_amount,
                   created_at, updated_at, revoked_at
            FROM invite_codes
            WHERE group_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Live (non-revoked) codes for a group.
    pub async fn list_live(&self, group_id: i64) -> Result<Vec<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_live_invite_codes");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            SELECT group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs,
                   is_temporary, is_vanity, is_widget, is_custom, cleared_amount,
                   created_at, updated_at, revoked_at
            FROM invite_codes
            WHERE group_id = $1 AND revoked_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Claim one observed use-count increment for a join.
    ///
    /// Compare-and-swap: the update only lands while the stored count is
    /// still below the observed count, so of two concurrent resolutions for
    /// the same increment exactly one gets the row back; the loser receives
    /// None and must leave the join unattributed.
    pub async fn claim_use(
        &self,
        group_id: i64,
        invite: &PlatformInvite,
    ) -> Result<Option<InviteCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("claim_invite_use");
        let result = sqlx::query_as::<_, InviteCodeEntity>(
            r#"
            INSERT INTO invite_codes
                (group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs, is_temporary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (group_id, code) DO UPDATE
            SET uses = EXCLUDED.uses,
                updated_at = now()
            WHERE invite_codes.uses < EXCLUDED.uses
            RETURNING group_id, code, channel_id, inviter_id, uses, max_uses, max_age_secs,
                      is_temporary, is_vanity, is_widget, is_custom, cleared_amount,
                      created_at, updated_at, revoked_at
            "#,
        )
        .bind(group_id)
        .bind(&invite.code)
        .bind(invite.channel_id)
        .bind(invite.inviter_id)
        .bind(invite.uses)
        .bind(invite.max_uses)
        .bind(invite.max_age_secs)
        .bind(invite.temporary)
        .bind(invite.created_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Revoke (soft delete) a code, preserving its attribution history.
    pub async fn revoke(&self, group_id: i64, code: &str) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("revoke_invite_code");
        let result = sqlx::query(
            r#"
            UPDATE invite_codes
            SET revoked_at = now(), updated_at = now()
            WHERE group_id = $1 AND code = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(code)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Tag or untag a code as custom; joins through it are then credited as
    /// custom invites.
    pub async fn set_custom(
        &self,
        group_id: i64,
        code: &str,
        custom: bool,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("set_invite_code_custom");
        let result = sqlx::query(
            r#"
            UPDATE invite_codes
            SET is_custom = $3, updated_at = now()
            WHERE group_id = $1 AND code = $2
            "#,
        )
        .bind(group_id)
        .bind(code)
        .bind(custom)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// Invalidate a code's remaining credit by raising `cleared_amount` to
    /// the current use-count. Returns the newly cleared delta, if the code
    /// exists.
    pub async fn clear_uses(&self, group_id: i64, code: &str) -> Result<Option<i32>, sqlx::Error> {
        let timer = QueryTimer::new("clear_invite_code_uses");
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE invite_codes AS ic
            SET cleared_amount = ic.uses, updated_at = now()
            FROM invite_codes AS prev
            WHERE ic.group_id = $1 AND ic.code = $2
              AND prev.group_id = ic.group_id AND prev.code = ic.code
            RETURNING GREATEST(ic.uses - prev.cleared_amount, 0)
            "#,
        )
        .bind(group_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    // Note: InviteCodeRepository tests require a database connection and are
    // covered by integration tests.
}
