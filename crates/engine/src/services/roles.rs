//! Role plan application.
//!
//! Each mutation is independent: one failing add or remove is logged and
//! reported, the rest of the plan still applies. Dangerous entries never
//! reach the gateway.

use tracing::warn;

use domain::models::RolePlan;

use crate::gateway::MembershipGateway;

/// One role mutation the gateway rejected after retries were exhausted.
#[derive(Debug, Clone)]
pub struct RoleMutationFailure {
    pub role_id: i64,
    pub removal: bool,
    pub error: String,
}

/// Result of applying a role plan.
#[derive(Debug, Clone, Default)]
pub struct AppliedRoles {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
    pub failed: Vec<RoleMutationFailure>,
}

/// Apply the actionable parts of a role plan through the gateway.
pub async fn apply_role_plan(
    gateway: &dyn MembershipGateway,
    group_id: i64,
    member_id: i64,
    plan: &RolePlan,
) -> AppliedRoles {
    let mut applied = AppliedRoles::default();

    for rank in &plan.should_have {
        match gateway.add_role(group_id, member_id, rank.role_id).await {
            Ok(()) => applied.added.push(rank.role_id),
            Err(error) => {
                warn!(
                    group_id = group_id,
                    member_id = member_id,
                    role_id = rank.role_id,
                    error = %error,
                    "Failed to add rank role"
                );
                applied.failed.push(RoleMutationFailure {
                    role_id: rank.role_id,
                    removal: false,
                    error: error.to_string(),
                });
            }
        }
    }

    for rank in &plan.should_not_have {
        match gateway.remove_role(group_id, member_id, rank.role_id).await {
            Ok(()) => applied.removed.push(rank.role_id),
            Err(error) => {
                warn!(
                    group_id = group_id,
                    member_id = member_id,
                    role_id = rank.role_id,
                    error = %error,
                    "Failed to remove rank role"
                );
                applied.failed.push(RoleMutationFailure {
                    role_id: rank.role_id,
                    removal: true,
                    error: error.to_string(),
                });
            }
        }
    }

    applied
}
