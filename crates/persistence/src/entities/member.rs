//! Member entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::Member;

/// Database row mapping for the members table.
#[derive(Debug, Clone, FromRow)]
pub struct MemberEntity {
    pub group_id: i64,
    pub member_id: i64,
    pub joined_at: DateTime<Utc>,
    pub total_regular: i32,
    pub total_custom: i32,
    pub total_fake: i32,
    pub total_leave: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberEntity> for Member {
    fn from(entity: MemberEntity) -> Self {
        Member {
            group_id: entity.group_id,
            member_id: entity.member_id,
            joined_at: entity.joined_at,
            total_regular: entity.total_regular,
            total_custom: entity.total_custom,
            total_fake: entity.total_fake,
            total_leave: entity.total_leave,
        }
    }
}
