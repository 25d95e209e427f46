//! # Join
//!
//! Waiting for another thread to finish. The joined thread owns the join
//! queue from creation on; joiners wait on it and are readied, best first,
//! when it finishes. Donation is off unless asked for, so joiners are ordered
//! by priority without boosting the thread they wait for.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{Clock, TickClock};
use crate::scheduler::{PriorityScheduler, QueueId};
use crate::thread::{ThreadId, ThreadRuntime};

/// Join slot of one thread
#[derive(Debug)]
pub struct JoinQueue<'s, C: Clock = TickClock> {
    sched: &'s PriorityScheduler<C>,
    queue: QueueId,
    target: ThreadId,
    finished: AtomicBool,
}

impl<'s, C: Clock> JoinQueue<'s, C> {
    /// Join slot for `target` that does not donate
    pub fn new(sched: &'s PriorityScheduler<C>, target: ThreadId) -> Self {
        Self::with_donation(sched, target, false)
    }

    /// Join slot for `target`; with `transfers_priority`, joiners donate
    /// their priority to it
    pub fn with_donation(
        sched: &'s PriorityScheduler<C>,
        target: ThreadId,
        transfers_priority: bool,
    ) -> Self {
        let _mask = sched.mask().disable();
        let queue = sched.new_resource_queue(transfers_priority);
        sched.acquire(queue, target);
        Self {
            sched,
            queue,
            target,
            finished: AtomicBool::new(false),
        }
    }

    /// Thread being joined
    pub fn target(&self) -> ThreadId {
        self.target
    }

    /// Resource queue backing this join slot
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Has the target finished?
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Wait for the target to finish
    ///
    /// Returns immediately if it already has.
    ///
    /// # Panics
    ///
    /// Panics if the target joins itself.
    pub fn join(&self, runtime: &impl ThreadRuntime) {
        let _mask = self.sched.mask().disable();
        let current = runtime.current_thread();
        assert!(
            current != self.target,
            "join: thread {} cannot join itself",
            current.0
        );

        if self.is_finished() {
            return;
        }
        self.sched.wait_for_access(self.queue, current);
        runtime.sleep();
    }

    /// Mark the target finished, ready every joiner and end the thread
    ///
    /// Returns how many joiners were readied.
    ///
    /// # Panics
    ///
    /// Panics unless called by the target.
    pub fn finish(&self, runtime: &impl ThreadRuntime) -> usize {
        let _mask = self.sched.mask().disable();
        let current = runtime.current_thread();
        assert!(
            current == self.target,
            "join: thread {} finishing on behalf of {}",
            current.0,
            self.target.0
        );

        self.finished.store(true, Ordering::Release);
        self.sched.release(self.queue, current);

        let mut woken = 0;
        while let Some(joiner) = self.sched.next_thread(self.queue) {
            self.sched.release(self.queue, joiner);
            runtime.ready(joiner);
            woken += 1;
        }
        log::debug!("join: thread {} finished, {} joiners readied", current.0, woken);

        runtime.finish();
        woken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::thread::mock::{Event, MockRuntime};
    use alloc::vec;

    const T1: ThreadId = ThreadId(1);
    const T2: ThreadId = ThreadId(2);
    const T3: ThreadId = ThreadId(3);
    const T4: ThreadId = ThreadId(4);

    fn sched() -> PriorityScheduler {
        PriorityScheduler::with_config(SchedulerConfig::minimal().with_invariant_checks(true))
    }

    fn set_priority(sched: &PriorityScheduler, thread: ThreadId, priority: u8) {
        let _mask = sched.mask().disable();
        sched.set_priority(thread, priority);
    }

    fn effective(sched: &PriorityScheduler, thread: ThreadId) -> u8 {
        let _mask = sched.mask().disable();
        sched.get_effective_priority(thread)
    }

    #[test]
    fn test_join_without_donation() {
        let sched = sched();
        let join = JoinQueue::new(&sched, T1);
        let rt = MockRuntime::new(T2);

        set_priority(&sched, T2, 6);
        join.join(&rt);
        assert_eq!(rt.events(), vec![Event::Sleep(T2)]);
        assert_eq!(effective(&sched, T1), 1);
    }

    #[test]
    fn test_join_with_donation() {
        let sched = sched();
        let join = JoinQueue::with_donation(&sched, T1, true);
        let rt = MockRuntime::new(T2);

        set_priority(&sched, T2, 6);
        join.join(&rt);
        assert_eq!(effective(&sched, T1), 6);

        rt.switch_to(T1);
        rt.clear();
        assert_eq!(join.finish(&rt), 1);
        assert_eq!(effective(&sched, T1), 1);
        assert_eq!(rt.events(), vec![Event::Ready(T2), Event::Finish(T1)]);
    }

    #[test]
    fn test_finish_wakes_by_priority() {
        let sched = sched();
        let join = JoinQueue::new(&sched, T1);
        let rt = MockRuntime::new(T2);

        set_priority(&sched, T4, 5);
        for thread in [T2, T3, T4] {
            rt.switch_to(thread);
            join.join(&rt);
        }

        rt.switch_to(T1);
        rt.clear();
        assert_eq!(join.finish(&rt), 3);
        assert_eq!(rt.readied(), vec![T4, T2, T3]);
        assert!(join.is_finished());

        let _mask = sched.mask().disable();
        assert_eq!(sched.owner(join.queue()), None);
        assert_eq!(sched.waiter_count(join.queue()), 0);
        assert!(sched.check_invariants().is_ok());
    }

    #[test]
    fn test_join_after_finish() {
        let sched = sched();
        let join = JoinQueue::new(&sched, T1);
        let rt = MockRuntime::new(T1);
        assert_eq!(join.finish(&rt), 0);

        rt.switch_to(T2);
        rt.clear();
        join.join(&rt);
        assert!(rt.events().is_empty());
    }

    #[test]
    #[should_panic(expected = "cannot join itself")]
    fn test_join_self() {
        let sched = sched();
        let join = JoinQueue::new(&sched, T1);
        let rt = MockRuntime::new(T1);
        join.join(&rt);
    }
}
