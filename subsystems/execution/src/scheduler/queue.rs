//! # Resource Queues
//!
//! One queue per contended resource: an ordered wait set, the current owner,
//! and whether waiters donate their priority to that owner.

use alloc::collections::BTreeSet;

use super::ordering::WaitKey;
use super::state::ThreadSlot;
use crate::thread::Priority;

/// Handle to a resource queue issued by a [`super::PriorityScheduler`]
///
/// Carries the issuing scheduler's id, so a handle presented to any other
/// scheduler is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId {
    pub(crate) sched: u32,
    pub(crate) index: usize,
}

impl QueueId {
    pub(crate) const fn new(sched: u32, index: usize) -> Self {
        Self { sched, index }
    }

    /// Position in the scheduler's queue table
    pub const fn index(self) -> usize {
        self.index
    }
}

/// Wait set of one arbitrable resource
#[derive(Debug)]
pub(crate) struct ResourceQueue {
    transfers_priority: bool,
    owner: Option<ThreadSlot>,
    waiters: BTreeSet<WaitKey>,
}

impl ResourceQueue {
    pub fn new(transfers_priority: bool) -> Self {
        Self {
            transfers_priority,
            owner: None,
            waiters: BTreeSet::new(),
        }
    }

    pub fn transfers_priority(&self) -> bool {
        self.transfers_priority
    }

    pub fn owner(&self) -> Option<ThreadSlot> {
        self.owner
    }

    /// Install a new owner, returning the previous one
    pub fn set_owner(&mut self, owner: Option<ThreadSlot>) -> Option<ThreadSlot> {
        core::mem::replace(&mut self.owner, owner)
    }

    /// Best-ranked waiter
    pub fn best(&self) -> Option<&WaitKey> {
        self.waiters.first()
    }

    /// Effective priority this queue donates to its owner, if any
    pub fn donation(&self) -> Option<Priority> {
        if self.transfers_priority {
            self.best().map(|key| key.priority)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: WaitKey) -> bool {
        self.waiters.insert(key)
    }

    pub fn remove(&mut self, key: &WaitKey) -> bool {
        self.waiters.remove(key)
    }

    pub fn contains(&self, key: &WaitKey) -> bool {
        self.waiters.contains(key)
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Waiters in rank order
    pub fn iter(&self) -> impl Iterator<Item = &WaitKey> + '_ {
        self.waiters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ordering::WaitStamp;

    fn key(priority: Priority, seq: u64, slot: usize) -> WaitKey {
        WaitKey::new(priority, WaitStamp { at: 0, seq }, ThreadSlot(slot))
    }

    #[test]
    fn test_best_and_donation() {
        let mut queue = ResourceQueue::new(true);
        assert!(queue.best().is_none());
        assert_eq!(queue.donation(), None);

        queue.insert(key(2, 0, 0));
        queue.insert(key(5, 1, 1));
        assert_eq!(queue.best().map(|k| k.slot), Some(ThreadSlot(1)));
        assert_eq!(queue.donation(), Some(5));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_no_donation_without_flag() {
        let mut queue = ResourceQueue::new(false);
        queue.insert(key(7, 0, 0));
        assert_eq!(queue.donation(), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_owner_replace() {
        let mut queue = ResourceQueue::new(true);
        assert_eq!(queue.set_owner(Some(ThreadSlot(2))), None);
        assert_eq!(queue.set_owner(Some(ThreadSlot(4))), Some(ThreadSlot(2)));
        assert_eq!(queue.owner(), Some(ThreadSlot(4)));
    }

    #[test]
    fn test_remove_exact_key() {
        let mut queue = ResourceQueue::new(true);
        let k = key(3, 0, 0);
        queue.insert(k);

        // A stale priority does not match the stored entry
        assert!(!queue.remove(&key(4, 0, 0)));
        assert!(queue.contains(&k));
        assert!(queue.remove(&k));
        assert_eq!(queue.len(), 0);
    }
}
