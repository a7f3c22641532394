//! Join event types and attribution outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Credit category a resolved join earns for its inviter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinClass {
    Regular,
    Custom,
    Fake,
}

impl JoinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinClass::Regular => "regular",
            JoinClass::Custom => "custom",
            JoinClass::Fake => "fake",
        }
    }
}

impl FromStr for JoinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(JoinClass::Regular),
            "custom" => Ok(JoinClass::Custom),
            "fake" => Ok(JoinClass::Fake),
            _ => Err(format!("Invalid join class: {}", s)),
        }
    }
}

impl fmt::Display for JoinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ephemeral record of one gateway join event, as handed to the resolver.
///
/// Not persisted beyond the ledger delta it produces; the engine assigns
/// the member's monotonic sequence token while processing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JoinEvent {
    pub group_id: i64,
    pub member_id: i64,
    pub joined_at: DateTime<Utc>,
    /// Externally supplied throwaway-account flag for fake classification.
    #[serde(default)]
    pub flagged_throwaway: bool,
}

/// Why a join produced no inviter credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnattributedReason {
    /// No code's use-count moved (vanity/widget join, or the invite was
    /// already deleted).
    NoCandidate,
    /// More than one code incremented at once; picking one would risk
    /// crediting the wrong inviter.
    AmbiguousCandidates,
    /// A concurrent join already claimed this code increment.
    IncrementAlreadyClaimed,
}

/// Outcome of resolving a join against the invite code registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Attribution {
    Attributed {
        code: String,
        inviter_id: i64,
        class: JoinClass,
    },
    Unattributed {
        reason: UnattributedReason,
    },
}

impl Attribution {
    pub fn is_attributed(&self) -> bool {
        matches!(self, Attribution::Attributed { .. })
    }
}
