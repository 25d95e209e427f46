//! # Scheduler Errors
//!
//! Precondition violations are fatal in the infallible API. The checked
//! entry points report them through [`SchedError`] instead.

use core::fmt;

use crate::scheduler::QueueId;
use crate::thread::{Priority, ThreadId};

/// Scheduler error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// Priority outside `[PRIORITY_MINIMUM, PRIORITY_MAXIMUM]`
    PriorityOutOfRange(Priority),
    /// Queue handle not issued by this scheduler
    UnknownQueue(QueueId),
    /// Scheduler entered without the interrupt mask held
    MaskNotHeld,
    /// Donation graph is inconsistent
    InvariantViolated {
        /// Thread whose state failed the check
        thread: ThreadId,
        /// Which invariant failed
        reason: &'static str,
    },
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriorityOutOfRange(p) => write!(f, "Priority {} out of range", p),
            Self::UnknownQueue(q) => write!(f, "Unknown resource queue {}", q.index()),
            Self::MaskNotHeld => write!(f, "Interrupt mask not held"),
            Self::InvariantViolated { thread, reason } => {
                write!(f, "Invariant violated for thread {}: {}", thread.0, reason)
            },
        }
    }
}

/// Result type for checked scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;
