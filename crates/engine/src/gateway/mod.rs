//! Group membership API gateway.
//!
//! The engine consumes the platform through this narrow trait; the REST
//! implementation lives in [`rest`], tests inject in-memory fakes.

pub mod rest;

use async_trait::async_trait;
use thiserror::Error;

use domain::models::{PlatformInvite, RoleInfo};

pub use rest::RestMembershipGateway;

/// Errors from the group membership API.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Rate limited by platform (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("Missing permission: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Platform returned status {0}")]
    Status(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected platform response: {0}")]
    Unexpected(String),
}

impl GatewayError {
    /// Whether retrying the same call may succeed. Permission and
    /// not-found errors are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::RateLimited { .. } => true,
            GatewayError::Status(status) => *status >= 500,
            GatewayError::Http(err) => err.is_timeout() || err.is_connect(),
            GatewayError::Forbidden(_)
            | GatewayError::NotFound(_)
            | GatewayError::Unexpected(_) => false,
        }
    }
}

/// A group member as seen by the platform.
#[derive(Debug, Clone)]
pub struct GatewayMember {
    pub member_id: i64,
    pub role_ids: Vec<i64>,
    pub is_bot: bool,
}

/// Narrow interface to the group membership platform.
///
/// Implementations are injected into the engine; nothing in this crate
/// reaches for ambient platform state.
#[async_trait]
pub trait MembershipGateway: Send + Sync {
    /// The group's current full invite list.
    async fn list_invites(&self, group_id: i64) -> Result<Vec<PlatformInvite>, GatewayError>;

    /// The group's role directory.
    async fn list_roles(&self, group_id: i64) -> Result<Vec<RoleInfo>, GatewayError>;

    /// A member snapshot, or None if the member is no longer in the group.
    async fn get_member(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<Option<GatewayMember>, GatewayError>;

    /// Position of the bot's own highest role, the authority ceiling for
    /// role mutations.
    async fn bot_highest_role_position(&self, group_id: i64) -> Result<i32, GatewayError>;

    async fn add_role(
        &self,
        group_id: i64,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError>;

    async fn remove_role(
        &self,
        group_id: i64,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError>;

    /// Create a platform invite on a channel.
    async fn create_invite(
        &self,
        group_id: i64,
        channel_id: i64,
        max_uses: Option<i32>,
        max_age_secs: Option<i64>,
        temporary: bool,
    ) -> Result<PlatformInvite, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::RateLimited {
            retry_after_secs: 2
        }
        .is_transient());
        assert!(GatewayError::Status(502).is_transient());
        assert!(!GatewayError::Status(400).is_transient());
        assert!(!GatewayError::Forbidden("add_role".to_string()).is_transient());
        assert!(!GatewayError::NotFound("member".to_string()).is_transient());
        assert!(!GatewayError::Unexpected("bad body".to_string()).is_transient());
    }
}
