//! Audit log domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actions recorded in the audit log, one entry per attribution or
/// reconciliation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AddRank,
    UpdateRank,
    RemoveRank,
    JoinAttributed,
    MemberLeft,
    MemberPromoted,
    MemberDemoted,
    InvitesCleared,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AddRank => "add_rank",
            AuditAction::UpdateRank => "update_rank",
            AuditAction::RemoveRank => "remove_rank",
            AuditAction::JoinAttributed => "join_attributed",
            AuditAction::MemberLeft => "member_left",
            AuditAction::MemberPromoted => "member_promoted",
            AuditAction::MemberDemoted => "member_demoted",
            AuditAction::InvitesCleared => "invites_cleared",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add_rank" => Ok(AuditAction::AddRank),
            "update_rank" => Ok(AuditAction::UpdateRank),
            "remove_rank" => Ok(AuditAction::RemoveRank),
            "join_attributed" => Ok(AuditAction::JoinAttributed),
            "member_left" => Ok(AuditAction::MemberLeft),
            "member_promoted" => Ok(AuditAction::MemberPromoted),
            "member_demoted" => Ok(AuditAction::MemberDemoted),
            "invites_cleared" => Ok(AuditAction::InvitesCleared),
            _ => Err(format!("Invalid audit action: {}", s)),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One structured audit event, produced by the engine and persisted by the
/// audit log collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEntry {
    pub group_id: i64,
    pub action: AuditAction,
    /// The member/moderator the action is attributed to; None for
    /// system-initiated actions.
    pub actor_id: Option<i64>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
