//! Audit event builders.
//!
//! Thin fluent layer over [`AuditEntry`] so call sites read as one
//! expression instead of struct literals with json! blocks.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::models::{AuditAction, AuditEntry, JoinClass, Rank};

/// Builder for one audit entry.
#[derive(Debug, Clone)]
pub struct AuditEntryBuilder {
    group_id: i64,
    action: AuditAction,
    actor_id: Option<i64>,
    payload: Map<String, Value>,
}

impl AuditEntryBuilder {
    /// Start an entry for a system-initiated action.
    pub fn new(group_id: i64, action: AuditAction) -> Self {
        Self {
            group_id,
            action,
            actor_id: None,
            payload: Map::new(),
        }
    }

    /// Attribute the action to a member or moderator.
    pub fn by(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Attach one payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> AuditEntry {
        AuditEntry {
            group_id: self.group_id,
            action: self.action,
            actor_id: self.actor_id,
            payload: Value::Object(self.payload),
            created_at: Utc::now(),
        }
    }
}

/// Prebuilt entries for the engine's common actions.
pub mod audit_events {
    use super::*;

    pub fn join_attributed(
        group_id: i64,
        member_id: i64,
        inviter_id: i64,
        code: &str,
        class: JoinClass,
        sequence: u64,
    ) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::JoinAttributed)
            .by(inviter_id)
            .with("member_id", member_id)
            .with("code", code)
            .with("class", class.as_str())
            .with("sequence", sequence)
            .build()
    }

    pub fn member_left(
        group_id: i64,
        member_id: i64,
        penalized_inviter_id: Option<i64>,
        sequence: u64,
    ) -> AuditEntry {
        let mut builder = AuditEntryBuilder::new(group_id, AuditAction::MemberLeft)
            .with("member_id", member_id)
            .with("sequence", sequence);
        if let Some(inviter_id) = penalized_inviter_id {
            builder = builder.with("penalized_inviter_id", inviter_id);
        }
        builder.build()
    }

    pub fn member_promoted(group_id: i64, member_id: i64, roles_added: Vec<i64>) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::MemberPromoted)
            .with("member_id", member_id)
            .with("roles_added", roles_added)
            .build()
    }

    pub fn member_demoted(group_id: i64, member_id: i64, roles_removed: Vec<i64>) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::MemberDemoted)
            .with("member_id", member_id)
            .with("roles_removed", roles_removed)
            .build()
    }

    pub fn rank_added(group_id: i64, actor_id: i64, rank: &Rank) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::AddRank)
            .by(actor_id)
            .with("role_id", rank.role_id)
            .with("num_invites", rank.num_invites)
            .build()
    }

    pub fn rank_updated(group_id: i64, actor_id: i64, rank: &Rank) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::UpdateRank)
            .by(actor_id)
            .with("role_id", rank.role_id)
            .with("num_invites", rank.num_invites)
            .build()
    }

    pub fn rank_removed(group_id: i64, actor_id: i64, role_id: i64) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::RemoveRank)
            .by(actor_id)
            .with("role_id", role_id)
            .build()
    }

    pub fn invites_cleared(
        group_id: i64,
        actor_id: i64,
        member_id: i64,
        amount: i32,
    ) -> AuditEntry {
        AuditEntryBuilder::new(group_id, AuditAction::InvitesCleared)
            .by(actor_id)
            .with("member_id", member_id)
            .with("amount", amount)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_payload_fields() {
        let entry = AuditEntryBuilder::new(1, AuditAction::AddRank)
            .by(7)
            .with("role_id", 99)
            .with("num_invites", 10)
            .build();

        assert_eq!(entry.group_id, 1);
        assert_eq!(entry.action, AuditAction::AddRank);
        assert_eq!(entry.actor_id, Some(7));
        assert_eq!(entry.payload["role_id"], 99);
        assert_eq!(entry.payload["num_invites"], 10);
    }

    #[test]
    fn test_system_entry_has_no_actor() {
        let entry = AuditEntryBuilder::new(1, AuditAction::MemberLeft).build();
        assert_eq!(entry.actor_id, None);
    }

    #[test]
    fn test_join_attributed_event() {
        let entry = audit_events::join_attributed(1, 42, 7, "abc123", JoinClass::Custom, 3);
        assert_eq!(entry.action, AuditAction::JoinAttributed);
        assert_eq!(entry.actor_id, Some(7));
        assert_eq!(entry.payload["member_id"], 42);
        assert_eq!(entry.payload["code"], "abc123");
        assert_eq!(entry.payload["class"], "custom");
        assert_eq!(entry.payload["sequence"], 3);
    }

    #[test]
    fn test_member_left_without_penalty() {
        let entry = audit_events::member_left(1, 42, None, 9);
        assert_eq!(entry.action, AuditAction::MemberLeft);
        assert!(entry.payload.get("penalized_inviter_id").is_none());
    }

    #[test]
    fn test_member_promoted_event() {
        let entry = audit_events::member_promoted(1, 42, vec![5, 6]);
        assert_eq!(entry.action, AuditAction::MemberPromoted);
        assert_eq!(entry.payload["roles_added"], serde_json::json!([5, 6]));
    }
}
