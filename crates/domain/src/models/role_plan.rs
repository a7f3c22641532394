//! Role assignment plan produced by rank reconciliation.

use serde::{Deserialize, Serialize};

use super::rank::Rank;

/// Transient output of one reconciliation call.
///
/// `should_have` and `should_not_have` are the actionable mutation lists;
/// `dangerous` holds ranks whose role sits at or above the bot's own highest
/// role position. Dangerous entries are partitioned out of the actionable
/// lists so a repeat call with unchanged inputs yields an empty mutation set
/// while the danger report persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RolePlan {
    pub should_have: Vec<Rank>,
    pub should_not_have: Vec<Rank>,
    pub dangerous: Vec<Rank>,
}

impl RolePlan {
    /// True when there is nothing to mutate (dangerous entries are report
    /// only and do not count).
    pub fn is_noop(&self) -> bool {
        self.should_have.is_empty() && self.should_not_have.is_empty()
    }
}

/// Full reconciliation outcome: the plan plus progress info for messaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RankReconciliation {
    pub plan: RolePlan,
    /// The next milestone: lowest unearned threshold, if any.
    pub next_rank: Option<Rank>,
    /// Display name of the next milestone's role, resolved from the role
    /// directory.
    pub next_rank_name: Option<String>,
    /// Size of the live ladder.
    pub num_ranks: usize,
    /// Ranks whose configured role no longer exists on the platform; skipped
    /// with a warning, never reconciled.
    pub skipped_missing_role: Vec<Rank>,
}

impl RankReconciliation {
    /// Invites still needed to reach the next milestone.
    pub fn next_rank_points_diff(&self, score: i64) -> Option<i64> {
        self.next_rank
            .as_ref()
            .map(|rank| i64::from(rank.num_invites) - score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::EntityState;
    use uuid::Uuid;

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
    fn test_is_noop_ignores_dangerous() {
        let plan = RolePlan {
            should_have: vec![],
            should_not_have: vec![],
            dangerous: vec![rank(1, 5)],
        };
        assert!(plan.is_noop());
    }

    #[test]
    fn test_is_noop_false_with_pending_mutations() {
        let plan = RolePlan {
            should_have: vec![rank(1, 5)],
            should_not_have: vec![],
            dangerous: vec![],
        };
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_next_rank_points_diff() {
        let outcome = RankReconciliation {
            plan: RolePlan::default(),
            next_rank: Some(rank(2, 10)),
            next_rank_name: Some("Veteran".to_string()),
            num_ranks: 2,
            skipped_missing_role: vec![],
        };
        assert_eq!(outcome.next_rank_points_diff(5), Some(5));
        assert_eq!(outcome.next_rank_points_diff(-2), Some(12));
    }

    #[test]
    fn test_next_rank_points_diff_at_top_of_ladder() {
        let outcome = RankReconciliation {
            plan: RolePlan::default(),
            next_rank: None,
            next_rank_name: None,
            num_ranks: 2,
            skipped_missing_role: vec![],
        };
        assert_eq!(outcome.next_rank_points_diff(100), None);
    }
}
