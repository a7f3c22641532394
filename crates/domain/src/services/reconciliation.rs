//! Rank reconciliation planning.
//!
//! Maps an effective invite score onto the group's rank ladder and diffs the
//! result against the member's current role set. Pure planning only; the
//! engine layer applies the mutations.

use std::collections::{HashMap, HashSet};

use crate::models::{Rank, RankReconciliation, RoleInfo, RolePlan};
use crate::models::rank::sort_ladder;

/// Inputs for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileInput<'a> {
    /// The member's effective invite score.
    pub score: i64,
    /// The group's live rank ladder, any order.
    pub ladder: &'a [Rank],
    /// Role ids the member currently holds.
    pub current_role_ids: &'a HashSet<i64>,
    /// Platform role directory keyed by role id.
    pub roles: &'a HashMap<i64, RoleInfo>,
    /// Position of the bot's own highest role; roles at or above it cannot
    /// be assigned or removed.
    pub bot_highest_position: i32,
    /// Whether unearned held roles are removed. Some deployments treat
    /// ranks as sticky and disable this.
    pub demotion_enabled: bool,
}

/// Compute the role assignment plan for a member.
///
/// Ranks whose role no longer exists on the platform are reported in
/// `skipped_missing_role` and excluded from the plan and progress info.
/// Ranks the bot lacks authority over go to `dangerous` instead of the
/// actionable lists, so repeating the call after applying the plan yields an
/// empty mutation set.
pub fn plan_roles(input: ReconcileInput<'_>) -> RankReconciliation {
    let mut ladder: Vec<Rank> = input.ladder.to_vec();
    sort_ladder(&mut ladder);

    let mut plan = RolePlan::default();
    let mut skipped_missing_role = Vec::new();
    let mut next_rank: Option<Rank> = None;

    for rank in ladder.iter() {
        let role = match input.roles.get(&rank.role_id) {
            Some(role) => role,
            None => {
                skipped_missing_role.push(rank.clone());
                continue;
            }
        };

        let earned = i64::from(rank.num_invites) <= input.score;
        let held = input.current_role_ids.contains(&rank.role_id);
        let out_of_reach = role.position >= input.bot_highest_position;

        if earned && !held {
            if out_of_reach {
                plan.dangerous.push(rank.clone());
            } else {
                plan.should_have.push(rank.clone());
            }
        } else if !earned && held && input.demotion_enabled {
            if out_of_reach {
                plan.dangerous.push(rank.clone());
            } else {
                plan.should_not_have.push(rank.clone());
            }
        }

        if !earned && next_rank.is_none() {
            next_rank = Some(rank.clone());
        }
    }

    let next_rank_name = next_rank.as_ref().and_then(|rank| {
        input
            .roles
            .get(&rank.role_id)
            .map(|role| role.name.clone())
    });

    RankReconciliation {
        plan,
        next_rank,
        next_rank_name,
        num_ranks: ladder.len(),
        skipped_missing_role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityState;
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

    fn role(id: i64, name: &str, position: i32) -> (i64, RoleInfo) {
        (
            id,
            RoleInfo {
                id,
                name: name.to_string(),
                position,
            },
        )
    }

    fn roles(entries: Vec<(i64, RoleInfo)>) -> HashMap<i64, RoleInfo> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_earned_rank_missing_from_member() {
        // Ladder [{5, roleA}, {10, roleB}], score 5: earns roleA, next is roleB.
        let ladder = vec![rank(1, 5), rank(2, 10)];
        let directory = roles(vec![role(1, "Trusted", 3), role(2, "Veteran", 4)]);
        let held = HashSet::new();

        let outcome = plan_roles(ReconcileInput {
            score: 5,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        let should_have: Vec<i64> = outcome.plan.should_have.iter().map(|r| r.role_id).collect();
        assert_eq!(should_have, vec![1]);
        assert!(outcome.plan.should_not_have.is_empty());
        assert!(outcome.plan.dangerous.is_empty());
        assert_eq!(outcome.next_rank.as_ref().unwrap().role_id, 2);
        assert_eq!(outcome.next_rank_name.as_deref(), Some("Veteran"));
        assert_eq!(outcome.next_rank_points_diff(5), Some(5));
        assert_eq!(outcome.num_ranks, 2);
    }

    #[test]
    fn test_demotion_after_score_drop() {
        // Member holds roleB (10 invites) but the score fell to 6.
        let ladder = vec![rank(1, 5), rank(2, 10)];
        let directory = roles(vec![role(1, "Trusted", 3), role(2, "Veteran", 4)]);
        let held: HashSet<i64> = [2].into_iter().collect();

        let outcome = plan_roles(ReconcileInput {
            score: 6,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        let should_have: Vec<i64> = outcome.plan.should_have.iter().map(|r| r.role_id).collect();
        let should_not_have: Vec<i64> = outcome
            .plan
            .should_not_have
            .iter()
            .map(|r| r.role_id)
            .collect();
        assert_eq!(should_have, vec![1]);
        assert_eq!(should_not_have, vec![2]);
    }

    #[test]
    fn test_sticky_ranks_when_demotion_disabled() {
        let ladder = vec![rank(1, 5), rank(2, 10)];
        let directory = roles(vec![role(1, "Trusted", 3), role(2, "Veteran", 4)]);
        let held: HashSet<i64> = [2].into_iter().collect();

        let outcome = plan_roles(ReconcileInput {
            score: 6,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: false,
        });

        assert!(outcome.plan.should_not_have.is_empty());
    }

    #[test]
    fn test_role_above_bot_is_dangerous_not_actionable() {
        let ladder = vec![rank(1, 5)];
        let directory = roles(vec![role(1, "Untouchable", 10)]);
        let held = HashSet::new();

        let outcome = plan_roles(ReconcileInput {
            score: 5,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        assert!(outcome.plan.should_have.is_empty());
        let dangerous: Vec<i64> = outcome.plan.dangerous.iter().map(|r| r.role_id).collect();
        assert_eq!(dangerous, vec![1]);
    }

    #[test]
    fn test_dangerous_removal_is_reported_not_planned() {
        let ladder = vec![rank(1, 50)];
        let directory = roles(vec![role(1, "Untouchable", 12)]);
        let held: HashSet<i64> = [1].into_iter().collect();

        let outcome = plan_roles(ReconcileInput {
            score: 0,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        assert!(outcome.plan.should_not_have.is_empty());
        assert_eq!(outcome.plan.dangerous.len(), 1);
    }

    #[test]
    fn test_missing_role_is_skipped_not_fatal() {
        let ladder = vec![rank(1, 5), rank(2, 10)];
        // Role 2 was deleted on the platform.
        let directory = roles(vec![role(1, "Trusted", 3)]);
        let held = HashSet::new();

        let outcome = plan_roles(ReconcileInput {
            score: 20,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        let should_have: Vec<i64> = outcome.plan.should_have.iter().map(|r| r.role_id).collect();
        assert_eq!(should_have, vec![1]);
        assert_eq!(outcome.skipped_missing_role.len(), 1);
        assert_eq!(outcome.skipped_missing_role[0].role_id, 2);
    }

    #[test]
    fn test_plan_is_idempotent_once_applied() {
        let ladder = vec![rank(1, 5), rank(2, 10)];
        let directory = roles(vec![role(1, "Trusted", 3), role(2, "Veteran", 4)]);

        let first = plan_roles(ReconcileInput {
            score: 12,
            ladder: &ladder,
            current_role_ids: &HashSet::new(),
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });
        assert_eq!(first.plan.should_have.len(), 2);

        // Apply the plan, then reconcile again with unchanged inputs.
        let held: HashSet<i64> = first.plan.should_have.iter().map(|r| r.role_id).collect();
        let second = plan_roles(ReconcileInput {
            score: 12,
            ladder: &ladder,
            current_role_ids: &held,
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        assert!(second.plan.is_noop());
        assert_eq!(second.num_ranks, 2);
        assert!(second.next_rank.is_none());
    }

    #[test]
    fn test_next_rank_is_lowest_unearned() {
        let ladder = vec![rank(3, 100), rank(1, 5), rank(2, 10)];
        let directory = roles(vec![
            role(1, "Trusted", 3),
            role(2, "Veteran", 4),
            role(3, "Legend", 5),
        ]);

        let outcome = plan_roles(ReconcileInput {
            score: 7,
            ladder: &ladder,
            current_role_ids: &HashSet::new(),
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        assert_eq!(outcome.next_rank.as_ref().unwrap().num_invites, 10);
        assert_eq!(outcome.next_rank_name.as_deref(), Some("Veteran"));
    }

    #[test]
    fn test_empty_ladder() {
        let outcome = plan_roles(ReconcileInput {
            score: 7,
            ladder: &[],
            current_role_ids: &HashSet::new(),
            roles: &HashMap::new(),
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        assert!(outcome.plan.is_noop());
        assert!(outcome.next_rank.is_none());
        assert_eq!(outcome.num_ranks, 0);
    }

    #[test]
    fn test_negative_score_earns_nothing() {
        let ladder = vec![rank(1, 5)];
        let directory = roles(vec![role(1, "Trusted", 3)]);

        let outcome = plan_roles(ReconcileInput {
            score: -3,
            ladder: &ladder,
            current_role_ids: &HashSet::new(),
            roles: &directory,
            bot_highest_position: 10,
            demotion_enabled: true,
        });

        assert!(outcome.plan.should_have.is_empty());
        assert_eq!(outcome.next_rank.as_ref().unwrap().role_id, 1);
    }
}
