//! # Priority Scheduler
//!
//! A scheduler that chooses threads by priority and donates priority through
//! resource queues.
//!
//! The next thread handed a resource is always a waiter whose effective
//! priority is no less than any other waiter's; among equals, the one that
//! has waited longest. A thread holding a donating resource runs at least at
//! the effective priority of its best waiter, transitively through chains of
//! ownership, so a low-priority holder is not starved behind unrelated
//! medium-priority work.
//!
//! ## Preconditions
//!
//! Every method except [`PriorityScheduler::increase_priority`] and
//! [`PriorityScheduler::decrease_priority`] must be called with the
//! scheduler's [`InterruptMask`] disabled. Calling without it, passing an
//! out-of-range priority or a foreign queue handle is a fatal error.

mod graph;
mod ordering;
pub mod priority;
mod queue;
mod snapshot;
mod state;

use core::sync::atomic::{AtomicU32, Ordering};

use spin::{Mutex, MutexGuard};

use self::graph::DonationGraph;
use self::queue::ResourceQueue;
pub use self::priority::{PRIORITY_DEFAULT, PRIORITY_MAXIMUM, PRIORITY_MINIMUM};
pub use self::queue::QueueId;
pub use self::snapshot::{QueueSnapshot, ThreadFlags, ThreadSnapshot};
use crate::clock::{Clock, TickClock};
use crate::config::SchedulerConfig;
use crate::error::{SchedError, SchedResult};
use crate::mask::InterruptMask;
use crate::thread::{Priority, ThreadId, ThreadRuntime};

/// Id of the next scheduler created
static NEXT_SCHEDULER_ID: AtomicU32 = AtomicU32::new(0);

/// Priority-donation scheduler
#[derive(Debug)]
pub struct PriorityScheduler<C: Clock = TickClock> {
    mask: InterruptMask,
    clock: C,
    config: SchedulerConfig,
    graph: Mutex<DonationGraph>,
}

impl PriorityScheduler<TickClock> {
    /// Create a scheduler with the default configuration
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler with `config`
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self::with_clock(TickClock::new(), config)
    }
}

impl Default for PriorityScheduler<TickClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PriorityScheduler<C> {
    /// Create a scheduler stamping waiters with `clock`
    pub fn with_clock(clock: C, config: SchedulerConfig) -> Self {
        Self {
            mask: InterruptMask::new(),
            clock,
            config,
            graph: Mutex::new(DonationGraph::new(
                NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
                config.log_donations,
            )),
        }
    }

    /// The mask every scheduler call must run under
    pub fn mask(&self) -> &InterruptMask {
        &self.mask
    }

    /// Active configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Clock used for enqueue timestamps
    pub fn clock(&self) -> &C {
        &self.clock
    }

    // =========================================================================
    // Priorities
    // =========================================================================

    /// Base priority of `thread`
    pub fn get_priority(&self, thread: ThreadId) -> Priority {
        let mut graph = self.enter();
        let slot = graph.slot_of(thread);
        graph.state(slot).base
    }

    /// Priority of `thread` after donation
    pub fn get_effective_priority(&self, thread: ThreadId) -> Priority {
        let mut graph = self.enter();
        let slot = graph.slot_of(thread);
        graph.state(slot).effective
    }

    /// Assign the base priority of `thread`
    ///
    /// # Panics
    ///
    /// Panics if the mask is not held or `priority` is out of range.
    pub fn set_priority(&self, thread: ThreadId, priority: Priority) {
        if let Err(err) = self.try_set_priority(thread, priority) {
            panic!("sched: set_priority({}, {}): {}", thread.0, priority, err);
        }
    }

    /// Checked variant of [`Self::set_priority`]
    pub fn try_set_priority(&self, thread: ThreadId, priority: Priority) -> SchedResult<()> {
        if !self.mask.is_disabled() {
            return Err(SchedError::MaskNotHeld);
        }
        if !priority::is_valid(priority) {
            return Err(SchedError::PriorityOutOfRange(priority));
        }

        let mut graph = self.graph.lock();
        let slot = graph.slot_of(thread);
        if graph.set_base(slot, priority) {
            self.settle(&graph);
        }
        Ok(())
    }

    /// Raise the current thread's priority by one step
    ///
    /// Returns `false`, changing nothing, when already at
    /// [`PRIORITY_MAXIMUM`].
    pub fn increase_priority(&self, runtime: &impl ThreadRuntime) -> bool {
        let _guard = self.mask.disable();
        let thread = runtime.current_thread();
        match priority::step_up(self.get_priority(thread)) {
            Some(next) => {
                self.set_priority(thread, next);
                true
            },
            None => {
                log::warn!("sched: thread {} already at maximum priority", thread.0);
                false
            },
        }
    }

    /// Lower the current thread's priority by one step
    ///
    /// Returns `false`, changing nothing, when already at
    /// [`PRIORITY_MINIMUM`].
    pub fn decrease_priority(&self, runtime: &impl ThreadRuntime) -> bool {
        let _guard = self.mask.disable();
        let thread = runtime.current_thread();
        match priority::step_down(self.get_priority(thread)) {
            Some(next) => {
                self.set_priority(thread, next);
                true
            },
            None => {
                log::warn!("sched: thread {} already at minimum priority", thread.0);
                false
            },
        }
    }

    // =========================================================================
    // Resource queues
    // =========================================================================

    /// Allocate a resource queue
    ///
    /// When `transfers_priority` is set, the owner of the queue inherits the
    /// effective priority of its best waiter.
    pub fn new_resource_queue(&self, transfers_priority: bool) -> QueueId {
        self.enter().new_queue(transfers_priority)
    }

    /// Register `thread` as waiting for `queue`
    ///
    /// The caller is expected to put the thread to sleep afterwards. Waiting
    /// twice on the same queue keeps the first registration.
    pub fn wait_for_access(&self, queue: QueueId, thread: ThreadId) {
        let mut graph = self.enter();
        self.check_queue(&graph, queue);
        let slot = graph.slot_of(thread);
        if graph.wait_for_access(queue, slot, self.clock.now()) {
            self.settle(&graph);
        }
    }

    /// Give `thread` ownership of `queue` without waiting
    pub fn acquire(&self, queue: QueueId, thread: ThreadId) {
        let mut graph = self.enter();
        self.check_queue(&graph, queue);
        let slot = graph.slot_of(thread);
        graph.acquire(queue, slot);
        self.settle(&graph);
    }

    /// Hand `queue` to its best waiter and return it
    ///
    /// Returns `None`, changing nothing, when nobody waits.
    pub fn next_thread(&self, queue: QueueId) -> Option<ThreadId> {
        let mut graph = self.enter();
        self.check_queue(&graph, queue);
        let slot = graph.next_thread(queue)?;
        self.settle(&graph);
        Some(graph.thread(slot))
    }

    /// The thread [`Self::next_thread`] would return, without dequeuing it
    pub fn peek_best(&self, queue: QueueId) -> Option<ThreadId> {
        let graph = self.enter();
        self.check_queue(&graph, queue);
        graph.peek_best(queue).map(|slot| graph.thread(slot))
    }

    /// Give up ownership of `queue`
    ///
    /// Returns `false` if `thread` did not own it. Priority donated through
    /// the queue is returned immediately.
    pub fn release(&self, queue: QueueId, thread: ThreadId) -> bool {
        let mut graph = self.enter();
        self.check_queue(&graph, queue);
        let Some(slot) = graph.find_slot(thread) else {
            return false;
        };
        let released = graph.release(queue, slot);
        if released {
            self.settle(&graph);
        }
        released
    }

    /// Current owner of `queue`
    pub fn owner(&self, queue: QueueId) -> Option<ThreadId> {
        let graph = self.enter();
        let owner = self.check_queue(&graph, queue).owner();
        owner.map(|slot| graph.thread(slot))
    }

    /// Number of threads waiting on `queue`
    pub fn waiter_count(&self, queue: QueueId) -> usize {
        let graph = self.enter();
        self.check_queue(&graph, queue).len()
    }

    /// Whether `queue` donates to its owner
    pub fn transfers_priority(&self, queue: QueueId) -> bool {
        let graph = self.enter();
        self.check_queue(&graph, queue).transfers_priority()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Scheduling state of `thread`
    pub fn snapshot_thread(&self, thread: ThreadId) -> ThreadSnapshot {
        let mut graph = self.enter();
        let slot = graph.slot_of(thread);
        let state = graph.state(slot);

        let mut flags = ThreadFlags::empty();
        flags.set(ThreadFlags::WAITING, state.is_waiting());
        flags.set(ThreadFlags::OWNER, state.owned.is_some());
        flags.set(ThreadFlags::BOOSTED, state.is_boosted());

        ThreadSnapshot {
            thread,
            priority: state.base,
            effective_priority: state.effective,
            owned_queue: state.owned,
            waiting_on: state.waiting_on.keys().copied().collect(),
            flags,
        }
    }

    /// Contents of `queue` in rank order
    pub fn snapshot_queue(&self, queue: QueueId) -> QueueSnapshot {
        let graph = self.enter();
        let target = self.check_queue(&graph, queue);
        QueueSnapshot {
            queue,
            transfers_priority: target.transfers_priority(),
            owner: target.owner().map(|slot| graph.thread(slot)),
            waiters: target
                .iter()
                .map(|key| (graph.thread(key.slot), key.priority))
                .collect(),
        }
    }

    /// Verify the donation graph
    pub fn check_invariants(&self) -> SchedResult<()> {
        if !self.mask.is_disabled() {
            return Err(SchedError::MaskNotHeld);
        }
        self.graph.lock().check_invariants()
    }

    /// Number of threads the scheduler has seen
    pub fn thread_count(&self) -> usize {
        self.enter().thread_count()
    }

    /// Number of queues allocated
    pub fn queue_count(&self) -> usize {
        self.enter().queue_count()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn enter(&self) -> MutexGuard<'_, DonationGraph> {
        assert!(self.mask.is_disabled(), "sched: {}", SchedError::MaskNotHeld);
        self.graph.lock()
    }

    fn check_queue<'g>(&self, graph: &'g DonationGraph, queue: QueueId) -> &'g ResourceQueue {
        match graph.queue(queue) {
            Some(target) => target,
            None => panic!("sched: {}", SchedError::UnknownQueue(queue)),
        }
    }

    fn settle(&self, graph: &DonationGraph) {
        if self.config.check_invariants {
            if let Err(err) = graph.check_invariants() {
                panic!("sched: {}", err);
            }
        }
    }
}
