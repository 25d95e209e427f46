//! # Blocking Primitives
//!
//! Locks and joins built on resource queues. Neither keeps any scheduling
//! logic of its own: a lock is a donating resource queue whose owner is the
//! holder, a join is a queue owned by the thread being waited for.

pub mod join;
pub mod lock;

pub use join::JoinQueue;
pub use lock::Lock;
