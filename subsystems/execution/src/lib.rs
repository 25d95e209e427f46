//! # Keel Execution Subsystem
//!
//! Priority-donation scheduling for cooperative kernel threads.
//!
//! ## Components
//!
//! - **Scheduler**: per-thread scheduling state, resource queues ordered by
//!   effective priority, and transitive priority donation through chains of
//!   ownership
//! - **Interrupt Mask**: the disable/restore token every scheduler call runs
//!   under
//! - **Clock**: enqueue timestamps for round-robin among equal priorities
//! - **Sync**: locks and join queues built on resource queues
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keel_execution::{PriorityScheduler, ThreadId};
//!
//! let sched = PriorityScheduler::new();
//! let _mask = sched.mask().disable();
//!
//! let lock = sched.new_resource_queue(true);
//! sched.acquire(lock, ThreadId(1));
//! sched.wait_for_access(lock, ThreadId(2));
//! sched.set_priority(ThreadId(2), 6);
//!
//! // The holder now runs at the waiter's priority
//! assert_eq!(sched.get_effective_priority(ThreadId(1)), 6);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod error;
pub mod mask;
pub mod scheduler;
pub mod sync;
pub mod thread;

pub use clock::{Clock, ManualClock, TickClock};
pub use config::SchedulerConfig;
pub use error::{SchedError, SchedResult};
pub use mask::{InterruptMask, MaskGuard};
pub use scheduler::{
    PriorityScheduler, QueueId, QueueSnapshot, ThreadFlags, ThreadSnapshot, PRIORITY_DEFAULT,
    PRIORITY_MAXIMUM, PRIORITY_MINIMUM,
};
pub use sync::{JoinQueue, Lock};
pub use thread::{Priority, ThreadId, ThreadRuntime};
