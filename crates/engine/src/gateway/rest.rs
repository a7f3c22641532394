//! REST implementation of the membership gateway.
//!
//! Wraps every platform call in the outbound rate limiter and a bounded
//! exponential-backoff retry for transient failures. Permission errors are
//! terminal and bubble up unchanged.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::Rng;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use domain::models::{PlatformInvite, RoleInfo};

use crate::config::GatewayConfig;

use super::{GatewayError, GatewayMember, MembershipGateway};

/// REST client for the group membership API.
pub struct RestMembershipGateway {
    client: Client,
    base_url: String,
    token: String,
    bot_member_id: i64,
    limiter: DefaultDirectRateLimiter,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl RestMembershipGateway {
    /// Create a gateway client from configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let per_minute = NonZeroU32::new(config.rate_limit_per_minute.max(1))
            .ok_or_else(|| GatewayError::Unexpected("zero rate limit".to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            bot_member_id: config.bot_member_id,
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Backoff for the next retry: exponential in the attempt count with
    /// jitter, but never shorter than a platform-provided Retry-After.
    fn backoff_delay(&self, attempt: u32, error: &GatewayError) -> Duration {
        let base = self.retry_base_delay_ms.saturating_mul(1 << attempt.min(8));
        let jitter = rand::thread_rng().gen_range(0..=self.retry_base_delay_ms.max(1));
        let mut delay_ms = base.saturating_add(jitter);
        if let GatewayError::RateLimited { retry_after_secs } = error {
            delay_ms = delay_ms.max(retry_after_secs.saturating_mul(1000));
        }
        Duration::from_millis(delay_ms)
    }

    /// Run one platform call under the rate limiter, retrying transient
    /// failures up to the configured bound. No lock is held across the
    /// sleep.
    async fn with_retry<T, Fut>(
        &self,
        operation: &str,
        mut call: impl FnMut() -> Fut,
    ) -> Result<T, GatewayError>
    where
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0u32;
        loop {
            self.limiter.until_ready().await;
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff_delay(attempt, &error);
                    warn!(
                        operation = operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient gateway failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&CreateInviteBody>,
        context: &str,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        map_status(response, context)
    }
}

fn map_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::FORBIDDEN => Err(GatewayError::Forbidden(context.to_string())),
        StatusCode::NOT_FOUND => Err(GatewayError::NotFound(context.to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
                .unwrap_or(1);
            Err(GatewayError::RateLimited { retry_after_secs })
        }
        other => Err(GatewayError::Status(other.as_u16())),
    }
}

#[derive(Debug, Deserialize)]
struct InvitePayload {
    code: String,
    channel_id: i64,
    inviter_id: i64,
    uses: i32,
    max_uses: Option<i32>,
    max_age_secs: Option<i64>,
    #[serde(default)]
    temporary: bool,
    created_at: DateTime<Utc>,
}

impl From<InvitePayload> for PlatformInvite {
    fn from(payload: InvitePayload) -> Self {
        PlatformInvite {
            code: payload.code,
            channel_id: payload.channel_id,
            inviter_id: payload.inviter_id,
            uses: payload.uses,
            // The platform reports 0 for unlimited.
            max_uses: payload.max_uses.filter(|n| *n > 0),
            max_age_secs: payload.max_age_secs.filter(|n| *n > 0),
            temporary: payload.temporary,
            created_at: payload.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateInviteBody {
    max_uses: Option<i32>,
    max_age_secs: Option<i64>,
    temporary: bool,
}

#[derive(Debug, Deserialize)]
struct MemberPayload {
    member_id: i64,
    #[serde(default)]
    role_ids: Vec<i64>,
    #[serde(default)]
    is_bot: bool,
}

#[async_trait]
impl MembershipGateway for RestMembershipGateway {
    async fn list_invites(&self, group_id: i64) -> Result<Vec<PlatformInvite>, GatewayError> {
        let path = format!("/groups/{group_id}/invites");
        let payloads: Vec<InvitePayload> = self
            .with_retry("list_invites", || async {
                self.send(Method::GET, &path, None, "list_invites")
                    .await?
                    .json()
                    .await
                    .map_err(GatewayError::from)
            })
            .await?;
        Ok(payloads.into_iter().map(PlatformInvite::from).collect())
    }

    async fn list_roles(&self, group_id: i64) -> Result<Vec<RoleInfo>, GatewayError> {
        let path = format!("/groups/{group_id}/roles");
        self.with_retry("list_roles", || async {
            self.send(Method::GET, &path, None, "list_roles")
                .await?
                .json()
                .await
                .map_err(GatewayError::from)
        })
        .await
    }

    async fn get_member(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<Option<GatewayMember>, GatewayError> {
        let path = format!("/groups/{group_id}/members/{member_id}");
        let result: Result<MemberPayload, GatewayError> = self
            .with_retry("get_member", || async {
                self.send(Method::GET, &path, None, "get_member")
                    .await?
                    .json()
                    .await
                    .map_err(GatewayError::from)
            })
            .await;

        match result {
            Ok(payload) => Ok(Some(GatewayMember {
                member_id: payload.member_id,
                role_ids: payload.role_ids,
                is_bot: payload.is_bot,
            })),
            Err(GatewayError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn bot_highest_role_position(&self, group_id: i64) -> Result<i32, GatewayError> {
        let bot = self.get_member(group_id, self.bot_member_id).await?;
        let bot = match bot {
            Some(bot) => bot,
            None => {
                warn!(group_id = group_id, "Bot member not found in group");
                return Ok(0);
            }
        };

        let roles = self.list_roles(group_id).await?;
        Ok(roles
            .iter()
            .filter(|role| bot.role_ids.contains(&role.id))
            .map(|role| role.position)
            .max()
            .unwrap_or(0))
    }

    async fn add_role(
        &self,
        group_id: i64,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError> {
        let path = format!("/groups/{group_id}/members/{member_id}/roles/{role_id}");
        self.with_retry("add_role", || async {
            self.send(Method::PUT, &path, None, "add_role").await?;
            Ok(())
        })
        .await
    }

    async fn remove_role(
        &self,
        group_id: i64,
        member_id: i64,
        role_id: i64,
    ) -> Result<(), GatewayError> {
        let path = format!("/groups/{group_id}/members/{member_id}/roles/{role_id}");
        self.with_retry("remove_role", || async {
            self.send(Method::DELETE, &path, None, "remove_role").await?;
            Ok(())
        })
        .await
    }

    async fn create_invite(
        &self,
        group_id: i64,
        channel_id: i64,
        max_uses: Option<i32>,
        max_age_secs: Option<i64>,
        temporary: bool,
    ) -> Result<PlatformInvite, GatewayError> {
        let path = format!("/groups/{group_id}/channels/{channel_id}/invites");
        let body = CreateInviteBody {
            max_uses,
            max_age_secs,
            temporary,
        };
        let payload: InvitePayload = self
            .with_retry("create_invite", || async {
                self.send(Method::POST, &path, Some(&body), "create_invite")
                    .await?
                    .json()
                    .await
                    .map_err(GatewayError::from)
            })
            .await?;
        Ok(payload.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> RestMembershipGateway {
        RestMembershipGateway::new(&GatewayConfig {
            base_url: "http://localhost:9000/".to_string(),
            token: "test-token".to_string(),
            bot_member_id: 1,
            request_timeout_secs: 5,
            rate_limit_per_minute: 60,
            max_retries: 3,
            retry_base_delay_ms: 100,
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = gateway();
        assert_eq!(gateway.url("/groups/1/invites"), "http://localhost:9000/groups/1/invites");
    }

    #[test]
    fn test_backoff_grows_with_attempts() {
        let gateway = gateway();
        let error = GatewayError::Status(503);
        let first = gateway.backoff_delay(0, &error);
        let third = gateway.backoff_delay(2, &error);
        // Jitter is bounded by one base delay.
        assert!(first <= Duration::from_millis(200));
        assert!(third >= Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_honors_retry_after() {
        let gateway = gateway();
        let error = GatewayError::RateLimited {
            retry_after_secs: 7,
        };
        assert!(gateway.backoff_delay(0, &error) >= Duration::from_secs(7));
    }

    #[test]
    fn test_invite_payload_zero_limits_map_to_none() {
        let payload = InvitePayload {
            code: "abc123".to_string(),
            channel_id: 10,
            inviter_id: 100,
            uses: 3,
            max_uses: Some(0),
            max_age_secs: Some(0),
            temporary: false,
            created_at: Utc::now(),
        };
        let invite: PlatformInvite = payload.into();
        assert_eq!(invite.max_uses, None);
        assert_eq!(invite.max_age_secs, None);
    }
}
