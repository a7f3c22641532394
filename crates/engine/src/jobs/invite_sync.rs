//! Invite registry sync background job.
//!
//! Periodically refreshes tracked groups' invite snapshots so attribution
//! keeps working after missed gateway events. A failing group is reported
//! and skipped; the remaining groups still sync.

use std::sync::Arc;

use tracing::{info, warn};

use crate::services::InviteTracker;

use super::scheduler::{Job, JobFrequency};

/// Background job that refreshes the invite code registry.
pub struct InviteSyncJob {
    tracker: Arc<InviteTracker>,
    group_ids: Vec<i64>,
    frequency_minutes: u64,
}

impl InviteSyncJob {
    pub fn new(tracker: Arc<InviteTracker>, group_ids: Vec<i64>, frequency_minutes: u64) -> Self {
        Self {
            tracker,
            group_ids,
            frequency_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for InviteSyncJob {
    fn name(&self) -> &'static str {
        "invite_sync"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.frequency_minutes.max(1))
    }

    async fn execute(&self) -> Result<(), String> {
        let mut synced_groups = 0usize;
        for group_id in &self.group_ids {
            match self.tracker.sync_invites(*group_id).await {
                Ok(codes) => {
                    synced_groups += 1;
                    info!(group_id = group_id, codes = codes, "Invite snapshot refreshed");
                }
                Err(e) => {
                    warn!(group_id = group_id, error = %e, "Invite snapshot refresh failed");
                }
            }
        }

        if synced_groups == 0 && !self.group_ids.is_empty() {
            return Err("No tracked group could be synced".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_has_a_floor_of_one_minute() {
        let freq = JobFrequency::Minutes(0u64.max(1));
        assert_eq!(freq.duration(), std::time::Duration::from_secs(60));
    }
}
