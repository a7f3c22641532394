//! Repository implementations.

pub mod audit_log;
pub mod invite_code;
pub mod join_log;
pub mod member;
pub mod rank;

pub use audit_log::AuditLogRepository;
pub use invite_code::InviteCodeRepository;
pub use join_log::JoinLogRepository;
pub use member::MemberRepository;
pub use rank::RankRepository;
