//! # Waiter Ordering
//!
//! Waiters on a resource queue are ranked by effective priority (highest
//! first), then by when they started waiting (earliest first). The key is
//! stored with the entry itself, so a queue's ordered set never has to look
//! anything up to compare two waiters.
//!
//! ```text
//!   rank  priority  at   seq
//!   0     6         40   9
//!   1     3         12   2     <- equal priority: earlier `at` first
//!   2     3         12   5     <- equal `at`: earlier `seq` first
//!   3     1         3    0
//! ```

use core::cmp::Ordering;

use super::state::ThreadSlot;
use crate::thread::Priority;

/// When a thread started waiting on one queue
///
/// `seq` is unique per scheduler, which makes the order total even when the
/// clock hands out the same tick twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaitStamp {
    /// Clock reading at enqueue
    pub at: u64,
    /// Enqueue sequence number
    pub seq: u64,
}

/// Ordering key of one waiter entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaitKey {
    pub priority: Priority,
    pub stamp: WaitStamp,
    pub slot: ThreadSlot,
}

impl WaitKey {
    pub fn new(priority: Priority, stamp: WaitStamp, slot: ThreadSlot) -> Self {
        Self {
            priority,
            stamp,
            slot,
        }
    }
}

impl Ord for WaitKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.stamp.cmp(&other.stamp))
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for WaitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;
    use alloc::vec::Vec;

    fn key(priority: Priority, at: u64, seq: u64, slot: usize) -> WaitKey {
        WaitKey::new(priority, WaitStamp { at, seq }, ThreadSlot(slot))
    }

    #[test]
    fn test_higher_priority_first() {
        assert!(key(5, 10, 1, 0) < key(2, 0, 0, 1));
    }

    #[test]
    fn test_earlier_wait_first() {
        assert!(key(3, 4, 0, 7) < key(3, 9, 1, 2));
        assert!(key(3, 4, 0, 7) < key(3, 4, 1, 2));
    }

    #[test]
    fn test_set_order() {
        let set: BTreeSet<WaitKey> = [
            key(1, 3, 0, 0),
            key(3, 12, 5, 1),
            key(6, 40, 9, 2),
            key(3, 12, 2, 3),
        ]
        .into_iter()
        .collect();

        let slots: Vec<usize> = set.iter().map(|k| k.slot.0).collect();
        assert_eq!(slots, [2, 3, 1, 0]);
    }
}
