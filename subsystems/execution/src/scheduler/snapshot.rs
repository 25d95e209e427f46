//! Point-in-time views of scheduling state, for diagnostics.

use alloc::vec::Vec;
use core::fmt;

use super::queue::QueueId;
use crate::thread::{Priority, ThreadId};

bitflags::bitflags! {
    /// Scheduling condition of a thread
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThreadFlags: u8 {
        /// Registered on at least one resource queue
        const WAITING = 1 << 0;
        /// Owns a resource queue that may donate to it
        const OWNER = 1 << 1;
        /// Effective priority above base
        const BOOSTED = 1 << 2;
    }
}

/// Scheduling state of one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSnapshot {
    /// Thread
    pub thread: ThreadId,
    /// Base priority
    pub priority: Priority,
    /// Effective priority
    pub effective_priority: Priority,
    /// Queue whose waiters donate to this thread
    pub owned_queue: Option<QueueId>,
    /// Queues the thread is waiting on
    pub waiting_on: Vec<QueueId>,
    /// Summary flags
    pub flags: ThreadFlags,
}

/// Contents of one resource queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Queue
    pub queue: QueueId,
    /// Whether waiters donate to the owner
    pub transfers_priority: bool,
    /// Current owner
    pub owner: Option<ThreadId>,
    /// Waiters in the order `next_thread` would hand them the resource,
    /// with their effective priorities
    pub waiters: Vec<(ThreadId, Priority)>,
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue {}", self.queue.index())?;
        if self.transfers_priority {
            write!(f, " [donating]")?;
        }
        match self.owner {
            Some(owner) => write!(f, " owner={}", owner.0)?,
            None => write!(f, " owner=-")?,
        }
        write!(f, " waiters=[")?;
        for (i, (thread, priority)) in self.waiters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}@{}", thread.0, priority)?;
        }
        write!(f, "]")
    }
}
