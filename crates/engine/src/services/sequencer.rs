//! Per-member event sequencing.
//!
//! Join/leave/reconcile work for one member must never run concurrently
//! with itself; events for different members are free to interleave. Each
//! member gets an async mutex guarding a monotonic sequence counter, so
//! holding the permit both serializes the member's timeline and hands out
//! the event's sequence token.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

type MemberKey = (i64, i64);

/// Hands out per-member permits. One sequencer instance is shared by all
/// engine operations.
#[derive(Default)]
pub struct MemberSequencer {
    slots: Mutex<HashMap<MemberKey, Arc<tokio::sync::Mutex<u64>>>>,
}

/// Exclusive access to one member's timeline, plus the sequence token for
/// the event being processed. Dropping the permit releases the member.
pub struct MemberPermit {
    guard: OwnedMutexGuard<u64>,
}

impl MemberPermit {
    /// The monotonic sequence token assigned to this event.
    pub fn sequence(&self) -> u64 {
        *self.guard
    }
}

impl MemberSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the member's timeline and assign the
    /// next sequence token.
    pub async fn acquire(&self, group_id: i64, member_id: i64) -> MemberPermit {
        let slot = {
            let mut slots = self.slots.lock().expect("member sequencer mutex poisoned");
            slots
                .entry((group_id, member_id))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(0)))
                .clone()
        };

        let mut guard = slot.lock_owned().await;
        *guard += 1;
        MemberPermit { guard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_sequence_tokens_are_monotonic() {
        let sequencer = MemberSequencer::new();

        let first = sequencer.acquire(1, 42).await.sequence();
        let second = sequencer.acquire(1, 42).await.sequence();
        let third = sequencer.acquire(1, 42).await.sequence();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(third, 3);
    }

    #[tokio::test]
    async fn test_members_sequence_independently() {
        let sequencer = MemberSequencer::new();

        assert_eq!(sequencer.acquire(1, 42).await.sequence(), 1);
        assert_eq!(sequencer.acquire(1, 43).await.sequence(), 1);
        assert_eq!(sequencer.acquire(2, 42).await.sequence(), 1);
        assert_eq!(sequencer.acquire(1, 42).await.sequence(), 2);
    }

    #[tokio::test]
    async fn test_permit_serializes_one_member() {
        let sequencer = Arc::new(MemberSequencer::new());
        let in_flight = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sequencer = Arc::clone(&sequencer);
            let in_flight = Arc::clone(&in_flight);
            handles.push(tokio::spawn(async move {
                let _permit = sequencer.acquire(1, 42).await;
                // Exactly one task may hold the permit at a time.
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(sequencer.acquire(1, 42).await.sequence(), 9);
    }
}
