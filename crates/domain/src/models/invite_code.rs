//! Invite code models: the tracked registry entry and the raw platform snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::EntityState;

/// A tracked invite code as held by the registry.
///
/// `uses` is the last use-count observed from the platform and is mutated
/// only by join resolution. `cleared_amount` is a manual correction
/// subtracted when computing credit, so moderators can invalidate suspect
/// invites without deleting history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InviteCode {
    pub group_id: i64,
    pub code: String,
    pub channel_id: i64,
    pub inviter_id: i64,
    pub uses: i32,
    pub max_uses: Option<i32>,
    pub max_age_secs: Option<i64>,
    pub temporary: bool,
    pub vanity: bool,
    pub widget: bool,
    pub custom: bool,
    pub cleared_amount: i32,
    pub created_at: DateTime<Utc>,
    pub state: EntityState,
}

impl InviteCode {
    /// Uses that still count toward credit after manual corrections.
    pub fn effective_uses(&self) -> i32 {
        (self.uses - self.cleared_amount).max(0)
    }

    /// Joins through this code are credited as custom rather than regular.
    pub fn counts_as_custom(&self) -> bool {
        self.vanity || self.widget || self.custom
    }
}

/// An invite as reported by the group membership platform at fetch time.
///
/// This is the resolver's view of the platform's invite list; it carries no
/// registry-side bookkeeping (`cleared_amount`, custom tagging, lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlatformInvite {
    pub code: String,
    pub channel_id: i64,
    pub inviter_id: i64,
    pub uses: i32,
    pub max_uses: Option<i32>,
    pub max_age_secs: Option<i64>,
    pub temporary: bool,
    pub created_at: DateTime<Utc>,
}

lazy_static::lazy_static! {
    static ref INVITE_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9-]{2,32}$").unwrap();
}

/// Validate the platform invite code format.
pub fn is_valid_code(code: &str) -> bool {
    INVITE_CODE_REGEX.is_match(code)
}
