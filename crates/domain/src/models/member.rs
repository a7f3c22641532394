//! Member model and the invite count breakdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked group member with the four additive invite counters.
///
/// Counters are monotonic and never negative; compensating negative deltas
/// clamp at zero at the storage layer. Counters persist across leaves and
/// rejoins, leave penalties accumulate in `total_leave` as separate entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Member {
    pub group_id: i64,
    pub member_id: i64,
    pub joined_at: DateTime<Utc>,
    pub total_regular: i32,
    pub total_custom: i32,
    pub total_fake: i32,
    pub total_leave: i32,
}

impl Member {
    /// A first-seen member with zeroed counters.
    pub fn new(group_id: i64, member_id: i64, joined_at: DateTime<Utc>) -> Self {
        Self {
            group_id,
            member_id,
            joined_at,
            total_regular: 0,
            total_custom: 0,
            total_fake: 0,
            total_leave: 0,
        }
    }
}

/// Effective invite score breakdown, used for display and as reconciliation
/// input. `total` may be negative; only the stored counters are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteCounts {
    pub total: i64,
    pub regular: i32,
    pub custom: i32,
    pub fake: i32,
    pub leave: i32,
}
