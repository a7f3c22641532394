//! Entity definitions (database row mappings).

pub mod audit_log;
pub mod invite_code;
pub mod join_log;
pub mod member;
pub mod rank;

pub use audit_log::AuditLogEntity;
pub use invite_code::InviteCodeEntity;
pub use join_log::JoinLogEntity;
pub use member::MemberEntity;
pub use rank::RankEntity;
