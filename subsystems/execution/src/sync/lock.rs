//! # Lock
//!
//! Mutual exclusion with priority inheritance. While a thread holds the lock,
//! it runs at least at the effective priority of the best thread blocked on
//! it. On release, the lock passes directly to that thread.

use crate::clock::{Clock, TickClock};
use crate::scheduler::{PriorityScheduler, QueueId};
use crate::thread::{ThreadId, ThreadRuntime};

/// Priority-inheriting lock
#[derive(Debug)]
pub struct Lock<'s, C: Clock = TickClock> {
    sched: &'s PriorityScheduler<C>,
    queue: QueueId,
}

impl<'s, C: Clock> Lock<'s, C> {
    /// Create a free lock
    pub fn new(sched: &'s PriorityScheduler<C>) -> Self {
        let _mask = sched.mask().disable();
        Self {
            sched,
            queue: sched.new_resource_queue(true),
        }
    }

    /// Resource queue backing this lock
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Acquire the lock, sleeping until it is handed over if necessary
    ///
    /// # Panics
    ///
    /// Panics if the current thread already holds the lock.
    pub fn acquire(&self, runtime: &impl ThreadRuntime) {
        let _mask = self.sched.mask().disable();
        let current = runtime.current_thread();

        match self.sched.owner(self.queue) {
            Some(holder) if holder == current => {
                panic!("lock: thread {} already holds the lock", current.0);
            },
            Some(holder) => {
                log::trace!("lock: thread {} blocks on holder {}", current.0, holder.0);
                self.sched.wait_for_access(self.queue, current);
                runtime.sleep();
            },
            None => self.sched.acquire(self.queue, current),
        }
    }

    /// Release the lock and hand it to the best waiter
    ///
    /// # Panics
    ///
    /// Panics if the current thread does not hold the lock.
    pub fn release(&self, runtime: &impl ThreadRuntime) {
        let _mask = self.sched.mask().disable();
        let current = runtime.current_thread();
        assert!(
            self.sched.release(self.queue, current),
            "lock: thread {} released a lock it does not hold",
            current.0
        );

        if let Some(next) = self.sched.next_thread(self.queue) {
            log::trace!("lock: handed from thread {} to {}", current.0, next.0);
            runtime.ready(next);
        }
    }

    /// Thread currently holding the lock
    pub fn holder(&self) -> Option<ThreadId> {
        let _mask = self.sched.mask().disable();
        self.sched.owner(self.queue)
    }

    /// Does the current thread hold the lock?
    pub fn is_held_by_current_thread(&self, runtime: &impl ThreadRuntime) -> bool {
        self.holder() == Some(runtime.current_thread())
    }
}
