//! # Donation Graph
//!
//! Arena of thread states and resource queues, addressed by index handles,
//! and every algorithm that mutates them.
//!
//! ## Donation
//!
//! ```text
//!   C ──waits──▶ Qb ──owned by──▶ B ──waits──▶ Qa ──owned by──▶ A
//!   (prio 6)                      (base 2)                      (base 1)
//!
//!   set_priority(C, 6):  C.eff = 6
//!                        B.eff = max(2, best(Qb)) = 6
//!                        A.eff = max(1, best(Qa)) = 6
//! ```
//!
//! An effective priority is always re-derived from scratch: the thread's base
//! priority, raised to the best waiter of the one queue it owns when that
//! queue transfers priority. Whenever the value changes, the owners of the
//! donating queues the thread waits on are re-derived in turn. Propagation
//! follows a worklist, so its depth is bounded by the heap, not the stack.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;

use super::ordering::{WaitKey, WaitStamp};
use super::priority;
use super::queue::{QueueId, ResourceQueue};
use super::state::{ThreadSlot, ThreadState};
use crate::error::{SchedError, SchedResult};
use crate::thread::{Priority, ThreadId};

/// Thread states and resource queues of one scheduler
#[derive(Debug)]
pub(crate) struct DonationGraph {
    /// Scheduler stamped into every queue handle issued here
    id: u32,
    states: Vec<ThreadState>,
    slots: HashMap<ThreadId, ThreadSlot>,
    queues: Vec<ResourceQueue>,
    /// Next enqueue sequence number
    next_seq: u64,
    log_donations: bool,
}

impl DonationGraph {
    pub fn new(id: u32, log_donations: bool) -> Self {
        Self {
            id,
            states: Vec::new(),
            slots: HashMap::new(),
            queues: Vec::new(),
            next_seq: 0,
            log_donations,
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// State slot of `thread`, created on first touch
    pub fn slot_of(&mut self, thread: ThreadId) -> ThreadSlot {
        if let Some(&slot) = self.slots.get(&thread) {
            return slot;
        }
        let slot = ThreadSlot(self.states.len());
        self.states.push(ThreadState::new(thread));
        self.slots.insert(thread, slot);
        log::trace!("sched: tracking thread {}", thread.0);
        slot
    }

    pub fn find_slot(&self, thread: ThreadId) -> Option<ThreadSlot> {
        self.slots.get(&thread).copied()
    }

    pub fn state(&self, slot: ThreadSlot) -> &ThreadState {
        &self.states[slot.0]
    }

    pub fn thread(&self, slot: ThreadSlot) -> ThreadId {
        self.states[slot.0].thread
    }

    pub fn queue(&self, queue: QueueId) -> Option<&ResourceQueue> {
        if queue.sched != self.id {
            return None;
        }
        self.queues.get(queue.index)
    }

    pub fn thread_count(&self) -> usize {
        self.states.len()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    pub fn new_queue(&mut self, transfers_priority: bool) -> QueueId {
        let id = QueueId::new(self.id, self.queues.len());
        self.queues.push(ResourceQueue::new(transfers_priority));
        log::trace!(
            "sched: queue {} created (transfers priority: {})",
            id.index,
            transfers_priority
        );
        id
    }

    /// Assign a new base priority; returns whether it differed
    pub fn set_base(&mut self, slot: ThreadSlot, base: Priority) -> bool {
        let state = &mut self.states[slot.0];
        if state.base == base {
            return false;
        }
        state.base = base;
        self.refresh(slot);
        true
    }

    /// Register `slot` as a waiter on `queue`; no-op if already registered
    pub fn wait_for_access(&mut self, queue: QueueId, slot: ThreadSlot, now: u64) -> bool {
        if self.states[slot.0].waiting_on.contains_key(&queue) {
            return false;
        }

        let stamp = WaitStamp {
            at: now,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let state = &mut self.states[slot.0];
        state.waiting_on.insert(queue, stamp);
        let key = WaitKey::new(state.effective, stamp, slot);
        let thread = state.thread;

        let target = &mut self.queues[queue.index];
        target.insert(key);
        log::trace!(
            "sched: thread {} waits on queue {} at {} (prio {})",
            thread.0,
            queue.index,
            now,
            key.priority
        );

        // A new waiter may raise what the owner inherits
        if let Some(owner) = target.owner() {
            self.refresh(owner);
        }
        true
    }

    /// Hand `queue` to `slot`, pulling it out of the wait set if present
    pub fn acquire(&mut self, queue: QueueId, slot: ThreadSlot) {
        self.unlink_wait(queue, slot);

        let previous = self.queues[queue.index].set_owner(Some(slot));
        let state = &mut self.states[slot.0];
        let dropped = state.owned.replace(queue).filter(|&q| q != queue);
        log::debug!("sched: thread {} acquired queue {}", state.thread.0, queue.index);
        if let Some(old) = dropped {
            log::debug!(
                "sched: queue {} no longer donates to thread {}",
                old.index,
                state.thread.0
            );
        }

        if let Some(prev) = previous.filter(|&p| p != slot) {
            let prev_state = &mut self.states[prev.0];
            if prev_state.owned == Some(queue) {
                prev_state.owned = None;
            }
            self.refresh(prev);
        }
        self.refresh(slot);
    }

    /// Dequeue the best-ranked waiter and make it the owner
    pub fn next_thread(&mut self, queue: QueueId) -> Option<ThreadSlot> {
        let best = self.queues[queue.index].best()?.slot;
        self.acquire(queue, best);
        Some(best)
    }

    /// Drop ownership of `queue` if `slot` holds it
    pub fn release(&mut self, queue: QueueId, slot: ThreadSlot) -> bool {
        let target = &mut self.queues[queue.index];
        if target.owner() != Some(slot) {
            return false;
        }
        target.set_owner(None);

        let state = &mut self.states[slot.0];
        if state.owned == Some(queue) {
            state.owned = None;
        }
        log::debug!("sched: thread {} released queue {}", state.thread.0, queue.index);
        self.refresh(slot);
        true
    }

    pub fn peek_best(&self, queue: QueueId) -> Option<ThreadSlot> {
        self.queues[queue.index].best().map(|key| key.slot)
    }

    // =========================================================================
    // Effective priority
    // =========================================================================

    /// Re-derive `start` and everything its change donates to
    fn refresh(&mut self, start: ThreadSlot) {
        let mut pending = vec![start];
        let mut owners = Vec::new();

        while let Some(slot) = pending.pop() {
            let old = self.states[slot.0].effective;
            if !self.recompute(slot) {
                continue;
            }

            let state = &self.states[slot.0];
            if self.log_donations {
                log::debug!(
                    "sched: thread {} effective priority {} -> {}",
                    state.thread.0,
                    old,
                    state.effective
                );
            }

            owners.clear();
            owners.extend(state.waiting_on.keys().filter_map(|q| {
                let waited = &self.queues[q.index];
                if waited.transfers_priority() {
                    waited.owner()
                } else {
                    None
                }
            }));
            // Reversed so the first queue's owner is handled first
            pending.extend(owners.iter().rev().copied());
        }
    }

    /// Re-derive the effective priority of one thread; returns whether it
    /// changed
    fn recompute(&mut self, slot: ThreadSlot) -> bool {
        self.unlink_all(slot);

        let state = &self.states[slot.0];
        let mut candidate = state.base;
        if let Some(donated) = state.owned.and_then(|q| self.queues[q.index].donation()) {
            candidate = candidate.max(donated);
        }

        let changed = candidate != state.effective;
        self.states[slot.0].effective = candidate;

        self.link_all(slot);
        changed
    }

    /// Take `slot` out of every wait set it is in
    fn unlink_all(&mut self, slot: ThreadSlot) {
        let state = &self.states[slot.0];
        for (&queue, &stamp) in &state.waiting_on {
            let key = WaitKey::new(state.effective, stamp, slot);
            self.queues[queue.index].remove(&key);
        }
    }

    /// Put `slot` back into every wait set under its current priority
    fn link_all(&mut self, slot: ThreadSlot) {
        let state = &self.states[slot.0];
        for (&queue, &stamp) in &state.waiting_on {
            let key = WaitKey::new(state.effective, stamp, slot);
            self.queues[queue.index].insert(key);
        }
    }

    /// Remove `slot`'s registration on `queue` entirely
    fn unlink_wait(&mut self, queue: QueueId, slot: ThreadSlot) {
        let state = &mut self.states[slot.0];
        if let Some(stamp) = state.waiting_on.remove(&queue) {
            let key = WaitKey::new(state.effective, stamp, slot);
            self.queues[queue.index].remove(&key);
        }
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Verify every structural invariant of the graph
    pub fn check_invariants(&self) -> SchedResult<()> {
        let violated = |slot: ThreadSlot, reason: &'static str| SchedError::InvariantViolated {
            thread: self.thread(slot),
            reason,
        };

        let mut registrations = 0;
        for (index, state) in self.states.iter().enumerate() {
            let slot = ThreadSlot(index);

            if !priority::is_valid(state.base) {
                return Err(violated(slot, "base priority out of range"));
            }
            if state.effective < state.base {
                return Err(violated(slot, "effective priority below base"));
            }

            for (&queue, &stamp) in &state.waiting_on {
                let key = WaitKey::new(state.effective, stamp, slot);
                if !self.queues[queue.index].contains(&key) {
                    return Err(violated(slot, "waiting on a queue that does not hold it"));
                }
                registrations += 1;
            }

            let mut expected = state.base;
            if let Some(queue) = state.owned {
                let owned = &self.queues[queue.index];
                if owned.owner() != Some(slot) {
                    return Err(violated(slot, "owned queue points at another owner"));
                }
                if let Some(donated) = owned.donation() {
                    expected = expected.max(donated);
                }
            }
            if state.effective != expected {
                return Err(violated(slot, "stale effective priority"));
            }
        }

        let entries: usize = self.queues.iter().map(ResourceQueue::len).sum();
        if entries != registrations {
            // Some wait set holds an entry its thread does not know about
            for (index, queue) in self.queues.iter().enumerate() {
                for key in queue.iter() {
                    let state = &self.states[key.slot.0];
                    if state.wait_key(key.slot, QueueId::new(self.id, index)) != Some(*key) {
                        return Err(violated(key.slot, "stale entry in wait set"));
                    }
                }
            }
        }
        Ok(())
    }
}
