//! # Thread Identity
//!
//! The scheduler never switches contexts itself. Threads are owned by an
//! external cooperative runtime; the scheduler only sees their identities and
//! asks the runtime to park or wake them.

/// Thread priority (0 = lowest, 7 = highest)
pub type Priority = u8;

/// Opaque thread identity issued by the thread runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

impl ThreadId {
    /// Raw identifier
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Cooperative thread runtime the blocking primitives drive
///
/// Every method is called with the scheduler's interrupt mask disabled.
/// `sleep` returns once some other thread has called `ready` on the caller.
pub trait ThreadRuntime {
    /// Thread currently executing
    fn current_thread(&self) -> ThreadId;

    /// Make `thread` eligible to run again
    fn ready(&self, thread: ThreadId);

    /// Deschedule the current thread until it is readied
    fn sleep(&self);

    /// Give up the processor without blocking
    fn yield_now(&self);

    /// Terminate the current thread
    fn finish(&self);
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording runtime for tests

    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use super::{ThreadId, ThreadRuntime};

    /// Runtime event recorded by [`MockRuntime`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        Ready(ThreadId),
        Sleep(ThreadId),
        Yield(ThreadId),
        Finish(ThreadId),
    }

    /// Single-threaded runtime whose "current thread" is set by the test
    #[derive(Debug)]
    pub struct MockRuntime {
        current: Cell<ThreadId>,
        events: RefCell<Vec<Event>>,
    }

    impl MockRuntime {
        pub fn new(current: ThreadId) -> Self {
            Self {
                current: Cell::new(current),
                events: RefCell::new(Vec::new()),
            }
        }

        /// Switch the running thread
        pub fn switch_to(&self, thread: ThreadId) {
            self.current.set(thread);
        }

        pub fn events(&self) -> Vec<Event> {
            self.events.borrow().clone()
        }

        pub fn readied(&self) -> Vec<ThreadId> {
            self.events
                .borrow()
                .iter()
                .filter_map(|e| match e {
                    Event::Ready(t) => Some(*t),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.events.borrow_mut().clear();
        }
    }

    impl ThreadRuntime for MockRuntime {
        fn current_thread(&self) -> ThreadId {
            self.current.get()
        }

        fn ready(&self, thread: ThreadId) {
            self.events.borrow_mut().push(Event::Ready(thread));
        }

        fn sleep(&self) {
            self.events.borrow_mut().push(Event::Sleep(self.current.get()));
        }

        fn yield_now(&self) {
            self.events.borrow_mut().push(Event::Yield(self.current.get()));
        }

        fn finish(&self) {
            self.events.borrow_mut().push(Event::Finish(self.current.get()));
        }
    }
}
