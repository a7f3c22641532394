//! Rank entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{EntityState, Rank};

/// Database row mapping for the ranks table.
#[derive(Debug, Clone, FromRow)]
pub struct RankEntity {
    pub id: Uuid,
    pub group_id: i64,
    pub role_id: i64,
    pub num_invites: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<RankEntity> for Rank {
    fn from(entity: RankEntity) -> Self {
        Rank {
            id: entity.id,
            group_id: entity.group_id,
            role_id: entity.role_id,
            num_invites: entity.num_invites,
            description: entity.description,
            state: EntityState::from_deleted_at(entity.deleted_at),
        }
    }
}
