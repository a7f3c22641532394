//! Rank models: the (role, invite-threshold) tiers of a group's ladder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::state::EntityState;

/// A membership tier: holders of `num_invites` effective invites earn
/// `role_id`. At most one live rank exists per `(group_id, role_id)`;
/// re-creating a rank for a role with a soft-deleted row revives that row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rank {
    pub id: Uuid,
    pub group_id: i64,
    pub role_id: i64,
    pub num_invites: i32,
    pub description: Option<String>,
    pub state: EntityState,
}

/// Request to create or update a rank.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateRankRequest {
    pub role_id: i64,

    /// Invite threshold (1-1000000)
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "num_invites must be between 1 and 1000000"
    ))]
    pub num_invites: i32,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Sort a ladder ascending by threshold, ties broken by role id so the
/// ordering is deterministic.
pub fn sort_ladder(ladder: &mut [Rank]) {
    ladder.sort_by_key(|r| (r.num_invites, r.role_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(role_id: i64, num_invites: i32) -> Rank {
        Rank {
            id: Uuid::new_v4(),
            group_id: 1,
            role_id,
            num_invites,
            description: None,
            state: EntityState::Active,
        }
    }

    #[test]
    fn test_sort_ladder_ascending() {
        let mut ladder = vec![rank(3, 50), rank(1, 5), rank(2, 10)];
        sort_ladder(&mut ladder);
        let thresholds: Vec<i32> = ladder.iter().map(|r| r.num_invites).collect();
        assert_eq!(thresholds, vec![5, 10, 50]);
    }

    #[test]
    fn test_sort_ladder_tie_break_is_deterministic() {
        let mut ladder = vec![rank(9, 10), rank(4, 10)];
        sort_ladder(&mut ladder);
        assert_eq!(ladder[0].role_id, 4);
        assert_eq!(ladder[1].role_id, 9);
    }

    #[test]
    fn test_create_rank_request_validation() {
        let valid = CreateRankRequest {
            role_id: 1,
            num_invites: 10,
            description: Some("trusted tier".to_string()),
        };
        assert!(valid.validate().is_ok());

        let zero_threshold = CreateRankRequest {
            role_id: 1,
            num_invites: 0,
            description: None,
        };
        assert!(zero_threshold.validate().is_err());

        let long_description = CreateRankRequest {
            role_id: 1,
            num_invites: 10,
            description: Some("x".repeat(501)),
        };
        assert!(long_description.validate().is_err());
    }
}
