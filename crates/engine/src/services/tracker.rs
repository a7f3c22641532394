//! The invite tracker service.
//!
//! Orchestrates attribution, the ledger, scoring and rank reconciliation
//! over the injected gateway and repositories. All public operations are
//! scoped to a single member; a failure in one never aborts another
//! member's event.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Duration;
use metrics::counter;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use validator::Validate;

use domain::models::{
    Attribution, CreateRankRequest, InviteCode, InviteCounts, JoinClass, JoinEvent, Rank,
    RankReconciliation, RoleInfo, UnattributedReason,
};
use domain::services::attribution::{classify_join, diff_invite_uses, ClassifyInput, CodeDelta};
use domain::services::audit::audit_events;
use domain::services::reconciliation::{plan_roles, ReconcileInput};
use domain::services::score::invite_counts;
use persistence::repositories::{
    AuditLogRepository, InviteCodeRepository, JoinLogRepository, MemberRepository, RankRepository,
};

use crate::error::EngineError;
use crate::gateway::MembershipGateway;

use super::roles::{apply_role_plan, AppliedRoles};
use super::sequencer::MemberSequencer;

/// Attribution and reconciliation policy for a deployment.
#[derive(Debug, Clone)]
pub struct TrackingPolicy {
    pub min_account_age_hours: i64,
    pub demotion_enabled: bool,
}

/// Outcome of processing one join event.
#[derive(Debug, Clone)]
pub struct JoinResolution {
    pub attribution: Attribution,
    pub sequence: u64,
}

/// Outcome of processing one leave event.
#[derive(Debug, Clone)]
pub struct LeaveResolution {
    pub penalized_inviter_id: Option<i64>,
    pub sequence: u64,
}

/// Outcome of one rank reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub counts: InviteCounts,
    pub reconciliation: RankReconciliation,
    pub applied: AppliedRoles,
}

/// The engine's public service. Dependencies are injected at construction;
/// there is no ambient platform or storage state.
pub struct InviteTracker {
    gateway: Arc<dyn MembershipGateway>,
    invite_codes: InviteCodeRepository,
    members: MemberRepository,
    join_log: JoinLogRepository,
    ranks: RankRepository,
    audit: AuditLogRepository,
    sequencer: MemberSequencer,
    policy: TrackingPolicy,
}

impl InviteTracker {
    pub fn new(pool: PgPool, gateway: Arc<dyn MembershipGateway>, policy: TrackingPolicy) -> Self {
        Self {
            gateway,
            invite_codes: InviteCodeRepository::new(pool.clone()),
            members: MemberRepository::new(pool.clone()),
            join_log: JoinLogRepository::new(pool.clone()),
            ranks: RankRepository::new(pool.clone()),
            audit: AuditLogRepository::new(pool),
            sequencer: MemberSequencer::new(),
            policy,
        }
    }

    /// Resolve a join event: find the invite code it consumed, claim the
    /// increment, credit the inviter and sync the registry.
    pub async fn resolve_join(&self, event: &JoinEvent) -> Result<JoinResolution, EngineError> {
        let JoinEvent {
            group_id,
            member_id,
            joined_at,
            flagged_throwaway,
        } = *event;

        let permit = self.sequencer.acquire(group_id, member_id).await;
        let sequence = permit.sequence();

        self.members
            .get_or_create(group_id, member_id, joined_at)
            .await?;

        let platform = self.gateway.list_invites(group_id).await?;
        let known: Vec<InviteCode> = self
            .invite_codes
            .list(group_id)
            .await?
            .into_iter()
            .map(InviteCode::from)
            .collect();

        let attribution = match diff_invite_uses(&platform, &known) {
            CodeDelta::None => {
                debug!(
                    group_id = group_id,
                    member_id = member_id,
                    "No invite code moved for join"
                );
                Attribution::Unattributed {
                    reason: UnattributedReason::NoCandidate,
                }
            }
            CodeDelta::Ambiguous(codes) => {
                debug!(
                    group_id = group_id,
                    member_id = member_id,
                    codes = ?codes,
                    "Multiple invite codes moved at once, leaving join unattributed"
                );
                Attribution::Unattributed {
                    reason: UnattributedReason::AmbiguousCandidates,
                }
            }
            CodeDelta::One(candidate) => {
                let invite = platform
                    .iter()
                    .find(|invite| invite.code == candidate.code)
                    .cloned()
                    .ok_or_else(|| EngineError::NotFound(candidate.code.clone()))?;

                match self.invite_codes.claim_use(group_id, &invite).await? {
                    None => Attribution::Unattributed {
                        reason: UnattributedReason::IncrementAlreadyClaimed,
                    },
                    Some(entity) => {
                        let code: InviteCode = entity.into();
                        let class = classify_join(&ClassifyInput {
                            member_id,
                            joined_at,
                            min_account_age: Duration::hours(self.policy.min_account_age_hours),
                            flagged_throwaway,
                            custom_code: code.counts_as_custom(),
                        });

                        self.members
                            .apply_join_credit(group_id, code.inviter_id, class)
                            .await?;
                        self.audit
                            .record(&audit_events::join_attributed(
                                group_id,
                                member_id,
                                code.inviter_id,
                                &code.code,
                                class,
                                sequence,
                            ))
                            .await?;

                        info!(
                            group_id = group_id,
                            member_id = member_id,
                            inviter_id = code.inviter_id,
                            code = %code.code,
                            class = %class,
                            "Join attributed"
                        );

                        Attribution::Attributed {
                            code: code.code,
                            inviter_id: code.inviter_id,
                            class,
                        }
                    }
                }
            }
        };

        // Sync observed counts regardless of the attribution outcome so the
        // next event cannot double-credit the same increment.
        for invite in &platform {
            self.invite_codes.upsert_observed(group_id, invite).await?;
        }

        let (inviter_id, code, class) = match &attribution {
            Attribution::Attributed {
                code,
                inviter_id,
                class,
            } => (Some(*inviter_id), Some(code.as_str()), Some(class.as_str())),
            Attribution::Unattributed { .. } => (None, None, None),
        };
        self.join_log
            .record(group_id, member_id, inviter_id, code, class, sequence as i64)
            .await?;

        let outcome = if attribution.is_attributed() {
            "attributed"
        } else {
            "unattributed"
        };
        counter!("invite_joins_total", "outcome" => outcome).increment(1);

        Ok(JoinResolution {
            attribution,
            sequence,
        })
    }

    /// Resolve a leave event: penalize the inviter credited for this
    /// member's latest regular/custom join. Each join funds at most one
    /// penalty, and a later rejoin does not reverse it.
    pub async fn resolve_leave(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<LeaveResolution, EngineError> {
        let permit = self.sequencer.acquire(group_id, member_id).await;
        let sequence = permit.sequence();

        let mut penalized_inviter_id = None;
        if let Some(join) = self.join_log.latest_attributed(group_id, member_id).await? {
            let class = join
                .join_class
                .as_deref()
                .and_then(|raw| raw.parse::<JoinClass>().ok());
            let counts_toward_score =
                matches!(class, Some(JoinClass::Regular) | Some(JoinClass::Custom));

            if let (Some(inviter_id), true) = (join.inviter_id, counts_toward_score) {
                if self.join_log.mark_penalized(join.id).await? {
                    self.members
                        .apply_leave_penalty(group_id, inviter_id)
                        .await?;
                    penalized_inviter_id = Some(inviter_id);
                    info!(
                        group_id = group_id,
                        member_id = member_id,
                        inviter_id = inviter_id,
                        "Leave penalty applied"
                    );
                }
            }
        }

        self.audit
            .record(&audit_events::member_left(
                group_id,
                member_id,
                penalized_inviter_id,
                sequence,
            ))
            .await?;
        counter!("invite_leaves_total").increment(1);

        Ok(LeaveResolution {
            penalized_inviter_id,
            sequence,
        })
    }

    /// The member's effective invite score breakdown. Unknown members have
    /// all-zero counts.
    pub async fn get_invite_counts(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<InviteCounts, EngineError> {
        let counts = match self.members.find(group_id, member_id).await? {
            Some(entity) => invite_counts(&entity.into()),
            None => InviteCounts {
                total: 0,
                regular: 0,
                custom: 0,
                fake: 0,
                leave: 0,
            },
        };
        Ok(counts)
    }

    /// Reconcile the member's role set against the rank ladder and apply
    /// the resulting plan. Safe to call repeatedly; with unchanged inputs
    /// the second pass mutates nothing.
    pub async fn reconcile_ranks(
        &self,
        group_id: i64,
        member_id: i64,
    ) -> Result<ReconcileOutcome, EngineError> {
        let _permit = self.sequencer.acquire(group_id, member_id).await;

        let counts = self.get_invite_counts(group_id, member_id).await?;

        let ladder: Vec<Rank> = self
            .ranks
            .list_live(group_id)
            .await?
            .into_iter()
            .map(Rank::from)
            .collect();

        let member = self
            .gateway
            .get_member(group_id, member_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("member {} in group {}", member_id, group_id))
            })?;
        if member.is_bot {
            return Err(EngineError::Validation(
                "bot members do not hold invite ranks".to_string(),
            ));
        }

        let roles: HashMap<i64, RoleInfo> = self
            .gateway
            .list_roles(group_id)
            .await?
            .into_iter()
            .map(|role| (role.id, role))
            .collect();
        let current_role_ids: HashSet<i64> = member.role_ids.iter().copied().collect();
        let bot_highest_position = self.gateway.bot_highest_role_position(group_id).await?;

        let reconciliation = plan_roles(ReconcileInput {
            score: counts.total,
            ladder: &ladder,
            current_role_ids: &current_role_ids,
            roles: &roles,
            bot_highest_position,
            demotion_enabled: self.policy.demotion_enabled,
        });

        for rank in &reconciliation.skipped_missing_role {
            warn!(
                group_id = group_id,
                role_id = rank.role_id,
                "Rank role no longer exists on the platform, skipping"
            );
        }
        for rank in &reconciliation.plan.dangerous {
            warn!(
                group_id = group_id,
                member_id = member_id,
                role_id = rank.role_id,
                "Rank role is above the bot's authority, reporting only"
            );
        }

        let applied = apply_role_plan(self.gateway.as_ref(), group_id, member_id, &reconciliation.plan).await;

        if !applied.added.is_empty() {
            self.audit
                .record(&audit_events::member_promoted(
                    group_id,
                    member_id,
                    applied.added.clone(),
                ))
                .await?;
            counter!("rank_mutations_total", "kind" => "promote")
                .increment(applied.added.len() as u64);
        }
        if !applied.removed.is_empty() {
            self.audit
                .record(&audit_events::member_demoted(
                    group_id,
                    member_id,
                    applied.removed.clone(),
                ))
                .await?;
            counter!("rank_mutations_total", "kind" => "demote")
                .increment(applied.removed.len() as u64);
        }

        Ok(ReconcileOutcome {
            counts,
            reconciliation,
            applied,
        })
    }

    /// Create or update the rank for a role. A soft-deleted rank on the
    /// same role is revived rather than duplicated.
    pub async fn add_rank(
        &self,
        group_id: i64,
        actor_id: i64,
        request: CreateRankRequest,
    ) -> Result<Rank, EngineError> {
        request.validate()?;

        let existing = self.ranks.find_by_role(group_id, request.role_id).await?;
        let entity = self
            .ranks
            .upsert(
                group_id,
                request.role_id,
                request.num_invites,
                request.description.as_deref(),
            )
            .await?;
        let rank: Rank = entity.into();

        let entry = match existing {
            Some(_) => audit_events::rank_updated(group_id, actor_id, &rank),
            None => audit_events::rank_added(group_id, actor_id, &rank),
        };
        self.audit.record(&entry).await?;

        Ok(rank)
    }

    /// Soft delete the rank for a role. Returns false if no live rank
    /// existed.
    pub async fn remove_rank(
        &self,
        group_id: i64,
        actor_id: i64,
        role_id: i64,
    ) -> Result<bool, EngineError> {
        let removed = self.ranks.soft_delete(group_id, role_id).await? > 0;
        if removed {
            self.audit
                .record(&audit_events::rank_removed(group_id, actor_id, role_id))
                .await?;
        }
        Ok(removed)
    }

    /// Administrative clearing of a member's accumulated leave penalties.
    pub async fn clear_leave_penalty(
        &self,
        group_id: i64,
        actor_id: i64,
        member_id: i64,
        amount: i32,
    ) -> Result<InviteCounts, EngineError> {
        if amount <= 0 {
            return Err(EngineError::Validation(
                "clear amount must be positive".to_string(),
            ));
        }

        let _permit = self.sequencer.acquire(group_id, member_id).await;
        let entity = self
            .members
            .clear_leave_penalty(group_id, member_id, amount)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("member {} in group {}", member_id, group_id))
            })?;

        self.audit
            .record(&audit_events::invites_cleared(
                group_id, actor_id, member_id, amount,
            ))
            .await?;

        Ok(invite_counts(&entity.into()))
    }

    /// Invalidate a suspect invite code's remaining credit and withdraw it
    /// from the inviter's counters. Returns the cleared delta.
    pub async fn clear_code_uses(
        &self,
        group_id: i64,
        actor_id: i64,
        code: &str,
    ) -> Result<i32, EngineError> {
        if !domain::models::invite_code::is_valid_code(code) {
            return Err(EngineError::Validation(format!(
                "invalid invite code format: {}",
                code
            )));
        }

        let entity = self
            .invite_codes
            .find(group_id, code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("invite code {}", code)))?;
        let tracked: InviteCode = entity.into();

        let delta = self
            .invite_codes
            .clear_uses(group_id, code)
            .await?
            .unwrap_or(0);
        if delta > 0 {
            let class = if tracked.counts_as_custom() {
                JoinClass::Custom
            } else {
                JoinClass::Regular
            };
            let _permit = self.sequencer.acquire(group_id, tracked.inviter_id).await;
            self.members
                .adjust(group_id, tracked.inviter_id, class, -delta)
                .await?;
            self.audit
                .record(&audit_events::invites_cleared(
                    group_id,
                    actor_id,
                    tracked.inviter_id,
                    delta,
                ))
                .await?;
        }

        Ok(delta)
    }

    /// Create a platform invite and register it immediately so later joins
    /// attribute to it.
    pub async fn create_invite(
        &self,
        group_id: i64,
        channel_id: i64,
        max_uses: Option<i32>,
        max_age_secs: Option<i64>,
        temporary: bool,
    ) -> Result<InviteCode, EngineError> {
        let invite = self
            .gateway
            .create_invite(group_id, channel_id, max_uses, max_age_secs, temporary)
            .await?;
        let entity = self.invite_codes.upsert_observed(group_id, &invite).await?;
        Ok(entity.into())
    }

    /// Refresh the registry from the platform's current invite list.
    /// Returns the number of codes synced.
    pub async fn sync_invites(&self, group_id: i64) -> Result<usize, EngineError> {
        let platform = self.gateway.list_invites(group_id).await?;
        for invite in &platform {
            self.invite_codes.upsert_observed(group_id, invite).await?;
        }
        debug!(
            group_id = group_id,
            codes = platform.len(),
            "Invite registry synced"
        );
        Ok(platform.len())
    }
}
