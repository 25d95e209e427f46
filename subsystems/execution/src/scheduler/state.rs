//! Per-thread scheduling state.

use alloc::collections::BTreeMap;

use super::ordering::{WaitKey, WaitStamp};
use super::priority::PRIORITY_DEFAULT;
use super::queue::QueueId;
use crate::thread::{Priority, ThreadId};

/// Index of a thread's state in the scheduler's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ThreadSlot(pub usize);

/// Scheduling record of one thread
#[derive(Debug)]
pub(crate) struct ThreadState {
    /// Thread this state belongs to
    pub thread: ThreadId,
    /// Priority explicitly assigned to the thread
    pub base: Priority,
    /// Base priority raised by donation
    pub effective: Priority,
    /// The one queue whose waiters donate to this thread
    pub owned: Option<QueueId>,
    /// Queues this thread waits on, with its stamp on each
    pub waiting_on: BTreeMap<QueueId, WaitStamp>,
}

impl ThreadState {
    pub fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            base: PRIORITY_DEFAULT,
            effective: PRIORITY_DEFAULT,
            owned: None,
            waiting_on: BTreeMap::new(),
        }
    }

    /// Key under which this thread currently sits in `queue`
    pub fn wait_key(&self, slot: ThreadSlot, queue: QueueId) -> Option<WaitKey> {
        self.waiting_on
            .get(&queue)
            .map(|&stamp| WaitKey::new(self.effective, stamp, slot))
    }

    pub fn is_waiting(&self) -> bool {
        !self.waiting_on.is_empty()
    }

    pub fn is_boosted(&self) -> bool {
        self.effective > self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = ThreadState::new(ThreadId(3));
        assert_eq!(state.base, PRIORITY_DEFAULT);
        assert_eq!(state.effective, PRIORITY_DEFAULT);
        assert!(state.owned.is_none());
        assert!(!state.is_waiting());
        assert!(!state.is_boosted());
    }

    #[test]
    fn test_wait_key_tracks_effective() {
        let mut state = ThreadState::new(ThreadId(3));
        let queue = QueueId::new(0, 0);
        assert!(state.wait_key(ThreadSlot(1), queue).is_none());

        let stamp = WaitStamp { at: 5, seq: 0 };
        state.waiting_on.insert(queue, stamp);
        state.effective = 4;

        let key = state.wait_key(ThreadSlot(1), queue);
        assert_eq!(key, Some(WaitKey::new(4, stamp, ThreadSlot(1))));
        assert!(state.is_boosted());
    }
}
