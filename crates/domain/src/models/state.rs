//! Lifecycle state shared by soft-deletable entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tagged lifecycle state for entities that are soft-deleted rather than
/// physically removed (invite codes, ranks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "at")]
pub enum EntityState {
    Active,
    SoftDeleted(DateTime<Utc>),
}

impl EntityState {
    /// Returns true if the entity participates in live queries.
    pub fn is_live(&self) -> bool {
        matches!(self, EntityState::Active)
    }

    /// The soft-deletion timestamp, if any.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            EntityState::Active => None,
            EntityState::SoftDeleted(at) => Some(*at),
        }
    }

    /// Maps a nullable deletion timestamp column to the tagged state.
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => EntityState::Active,
            Some(at) => EntityState::SoftDeleted(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_is_live() {
        assert!(EntityState::Active.is_live());
        assert_eq!(EntityState::Active.deleted_at(), None);
    }

    #[test]
    fn test_soft_deleted_is_not_live() {
        let at = Utc::now();
        let state = EntityState::SoftDeleted(at);
        assert!(!state.is_live());
        assert_eq!(state.deleted_at(), Some(at));
    }

    #[test]
    fn test_from_deleted_at_round_trip() {
        let at = Utc::now();
        assert_eq!(EntityState::from_deleted_at(None), EntityState::Active);
        assert_eq!(
            EntityState::from_deleted_at(Some(at)),
            EntityState::SoftDeleted(at)
        );
        assert_eq!(
            EntityState::from_deleted_at(EntityState::SoftDeleted(at).deleted_at()),
            EntityState::SoftDeleted(at)
        );
    }
}
