//! Invite code entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{EntityState, InviteCode};

/// Database row mapping for the invite_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct InviteCodeEntity {
    pub group_id: i64,
    pub code: String,
    pub channel_id: i64,
    pub inviter_id: i64,
    pub uses: i32,
    pub max_uses: Option<i32>,
    pub max_age_secs: Option<i64>,
    pub is_temporary: bool,
    pub is_vanity: bool,
    pub is_widget: bool,
    pub is_custom: bool,
    pub cleared_amount: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<InviteCodeEntity> for InviteCode {
    fn from(entity: InviteCodeEntity) -> Self {
        InviteCode {
            group_id: entity.group_id,
            code: entity.code,
            channel_id: entity.channel_id,
            inviter_id: entity.inviter_id,
            uses: entity.uses,
            max_uses: entity.max_uses,
            max_age_secs: entity.max_age_secs,
            temporary: entity.is_temporary,
            vanity: entity.is_vanity,
            widget: entity.is_widget,
            custom: entity.is_custom,
            cleared_amount: entity.cleared_amount,
            created_at: entity.created_at,
            state: EntityState::from_deleted_at(entity.revoked_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoked_at_maps_to_soft_deleted() {
        let at = Utc::now();
        let entity = InviteCodeEntity {
            group_id: 1,
            code: "abc123".to_string(),
            channel_id: 10,
            inviter_id: 100,
            uses: 2,
            max_uses: None,
            max_age_secs: None,
            is_temporary: false,
            is_vanity: false,
            is_widget: false,
            is_custom: true,
            cleared_amount: 1,
            created_at: at,
            updated_at: at,
            revoked_at: Some(at),
        };

        let code: InviteCode = entity.into();
        assert_eq!(code.state, EntityState::SoftDeleted(at));
        assert!(code.custom);
        assert_eq!(code.effective_uses(), 1);
    }
}
