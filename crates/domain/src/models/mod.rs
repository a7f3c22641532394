//! Domain models for the invite tracker.

pub mod audit_log;
pub mod invite_code;
pub mod join_event;
pub mod member;
pub mod rank;
pub mod role;
pub mod role_plan;
pub mod state;

pub use audit_log::{AuditAction, AuditEntry};
pub use invite_code::{InviteCode, PlatformInvite};
pub use join_event::{Attribution, JoinClass, JoinEvent, UnattributedReason};
pub use member::{InviteCounts, Member};
pub use rank::{CreateRankRequest, Rank};
pub use role::RoleInfo;
pub use role_plan::{RankReconciliation, RolePlan};
pub use state::EntityState;
