//! Join attribution: diff the platform invite list against the registry to
//! find the code a join consumed, then classify the credit.
//!
//! Both functions are pure; given identical snapshots they always produce
//! the same result. The engine layer is responsible for actually claiming
//! the increment before any credit is written.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{InviteCode, JoinClass, PlatformInvite};
use crate::snowflake;

/// A code whose use-count advanced between the registry snapshot and the
/// platform snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUse {
    pub code: String,
    /// The platform-observed count the claim must compare-and-swap to.
    pub observed_uses: i32,
    pub inviter_id: i64,
}

/// Result of diffing invite use-counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeDelta {
    /// No code moved: vanity/widget join, or the invite is already gone.
    None,
    /// Exactly one code moved; the join is attributable to it.
    One(CandidateUse),
    /// Several codes moved at once. Guessing would risk crediting the wrong
    /// inviter, so the join stays unattributed. Codes are sorted for
    /// deterministic reporting.
    Ambiguous(Vec<String>),
}

/// Diff the platform's current invite list against the registry's last-known
/// use-counts. Codes the registry has never seen count from zero; codes
/// missing from the platform snapshot produce no candidate.
pub fn diff_invite_uses(platform: &[PlatformInvite], known: &[InviteCode]) -> CodeDelta {
    let last_seen: HashMap<&str, i32> = known
        .iter()
        .map(|code| (code.code.as_str(), code.uses))
        .collect();

    let mut candidates: Vec<CandidateUse> = platform
        .iter()
        .filter(|invite| invite.uses > last_seen.get(invite.code.as_str()).copied().unwrap_or(0))
        .map(|invite| CandidateUse {
            code: invite.code.clone(),
            observed_uses: invite.uses,
            inviter_id: invite.inviter_id,
        })
        .collect();

    match candidates.len() {
        0 => CodeDelta::None,
        1 => CodeDelta::One(candidates.remove(0)),
        _ => {
            let mut codes: Vec<String> = candidates.into_iter().map(|c| c.code).collect();
            codes.sort();
            CodeDelta::Ambiguous(codes)
        }
    }
}

/// Inputs for classifying an attributed join.
#[derive(Debug, Clone)]
pub struct ClassifyInput {
    pub member_id: i64,
    pub joined_at: DateTime<Utc>,
    /// Accounts younger than this at join time are credited as fake.
    pub min_account_age: Duration,
    /// Externally supplied throwaway-account flag.
    pub flagged_throwaway: bool,
    /// The matched code is vanity/widget or manually tagged custom.
    pub custom_code: bool,
}

/// Classify an attributed join. Fake takes precedence over custom, custom
/// over regular.
pub fn classify_join(input: &ClassifyInput) -> JoinClass {
    if input.flagged_throwaway
        || snowflake::account_age_at(input.member_id, input.joined_at) < input.min_account_age
    {
        return JoinClass::Fake;
    }
    if input.custom_code {
        return JoinClass::Custom;
    }
    JoinClass::Regular
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityState;

    fn platform_invite(code: &str, uses: i32, inviter_id: i64) -> PlatformInvite {
        PlatformInvite {
            code: code.to_string(),
            channel_id: 10,
            inviter_id,
            uses,
            max_uses: None,
            max_age_secs: None,
            temporary: false,
            created_at: Utc::now(),
        }
    }

    fn known_code(code: &str, uses: i32) -> InviteCode {
        InviteCode {
            group_id: 1,
            code: code.to_string(),
            channel_id: 10,
            inviter_id: 100,
            uses,
            max_uses: None,
            max_age_secs: None,
            temporary: false,
            vanity: false,
            widget: false,
            custom: false,
            cleared_amount: 0,
            created_at: Utc::now(),
            state: EntityState::Active,
        }
    }

    /// An id whose encoded creation instant sits `hours` before `at`.
    fn member_id_with_age(at: DateTime<Utc>, hours: i64) -> i64 {
        let created_ms = at.timestamp_millis() - hours * 3_600_000;
        (created_ms - snowflake::SNOWFLAKE_EPOCH_MS) << 22
    }

    #[test]
    fn test_diff_single_increment() {
        let platform = vec![platform_invite("aaa", 4, 7), platform_invite("bbb", 2, 8)];
        let known = vec![known_code("aaa", 3), known_code("bbb", 2)];

        match diff_invite_uses(&platform, &known) {
            CodeDelta::One(candidate) => {
                assert_eq!(candidate.code, "aaa");
                assert_eq!(candidate.observed_uses, 4);
                assert_eq!(candidate.inviter_id, 7);
            }
            other => panic!("Expected single candidate, got {:?}", other),
        }
    }

    #[test]
    fn test_diff_no_movement() {
        let platform = vec![platform_invite("aaa", 3, 7)];
        let known = vec![known_code("aaa", 3)];
        assert_eq!(diff_invite_uses(&platform, &known), CodeDelta::None);
    }

    #[test]
    fn test_diff_unknown_code_counts_from_zero() {
        let platform = vec![platform_invite("fresh", 1, 9)];
        let known = vec![];

        match diff_invite_uses(&platform, &known) {
            CodeDelta::One(candidate) => {
                assert_eq!(candidate.code, "fresh");
                assert_eq!(candidate.inviter_id, 9);
            }
            other => panic!("Expected single candidate, got {:?}", other),
        }
    }

    #[test]
    fn test_diff_unknown_unused_code_is_not_a_candidate() {
        let platform = vec![platform_invite("fresh", 0, 9)];
        assert_eq!(diff_invite_uses(&platform, &[]), CodeDelta::None);
    }

    #[test]
    fn test_diff_multiple_increments_is_ambiguous() {
        let platform = vec![platform_invite("zzz", 2, 7), platform_invite("aaa", 5, 8)];
        let known = vec![known_code("zzz", 1), known_code("aaa", 4)];

        match diff_invite_uses(&platform, &known) {
            CodeDelta::Ambiguous(codes) => assert_eq!(codes, vec!["aaa", "zzz"]),
            other => panic!("Expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_diff_deleted_code_produces_no_candidate() {
        // Registry still remembers the code, platform no longer lists it.
        let platform = vec![];
        let known = vec![known_code("gone", 3)];
        assert_eq!(diff_invite_uses(&platform, &known), CodeDelta::None);
    }

    #[test]
    fn test_diff_decreased_uses_is_ignored() {
        let platform = vec![platform_invite("aaa", 1, 7)];
        let known = vec![known_code("aaa", 3)];
        assert_eq!(diff_invite_uses(&platform, &known), CodeDelta::None);
    }

    #[test]
    fn test_diff_is_deterministic() {
        let platform = vec![platform_invite("aaa", 4, 7), platform_invite("bbb", 3, 8)];
        let known = vec![known_code("aaa", 3), known_code("bbb", 3)];

        let first = diff_invite_uses(&platform, &known);
        for _ in 0..10 {
            assert_eq!(diff_invite_uses(&platform, &known), first);
        }
    }

    #[test]
    fn test_classify_regular_by_default() {
        let at = Utc::now();
        let input = ClassifyInput {
            member_id: member_id_with_age(at, 24 * 30),
            joined_at: at,
            min_account_age: Duration::hours(24),
            flagged_throwaway: false,
            custom_code: false,
        };
        assert_eq!(classify_join(&input), JoinClass::Regular);
    }

    #[test]
    fn test_classify_young_account_is_fake() {
        let at = Utc::now();
        let input = ClassifyInput {
            member_id: member_id_with_age(at, 2),
            joined_at: at,
            min_account_age: Duration::hours(24),
            flagged_throwaway: false,
            custom_code: false,
        };
        assert_eq!(classify_join(&input), JoinClass::Fake);
    }

    #[test]
    fn test_classify_throwaway_flag_is_fake() {
        let at = Utc::now();
        let input = ClassifyInput {
            member_id: member_id_with_age(at, 24 * 30),
            joined_at: at,
            min_account_age: Duration::hours(24),
            flagged_throwaway: true,
            custom_code: true,
        };
        // Fake wins over custom.
        assert_eq!(classify_join(&input), JoinClass::Fake);
    }

    #[test]
    fn test_classify_custom_code() {
        let at = Utc::now();
        let input = ClassifyInput {
            member_id: member_id_with_age(at, 24 * 30),
            joined_at: at,
            min_account_age: Duration::hours(24),
            flagged_throwaway: false,
            custom_code: true,
        };
        assert_eq!(classify_join(&input), JoinClass::Custom);
    }
}
