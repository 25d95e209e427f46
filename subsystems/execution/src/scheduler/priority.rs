//! Priority bounds.

use crate::thread::Priority;

/// The minimum priority a thread can have
pub const PRIORITY_MINIMUM: Priority = 0;

/// The maximum priority a thread can have
pub const PRIORITY_MAXIMUM: Priority = 7;

/// Priority of a thread the scheduler has not seen before
pub const PRIORITY_DEFAULT: Priority = 1;

static_assertions::const_assert!(PRIORITY_MINIMUM < PRIORITY_MAXIMUM);
static_assertions::const_assert!(PRIORITY_DEFAULT <= PRIORITY_MAXIMUM);

/// Is `priority` within `[PRIORITY_MINIMUM, PRIORITY_MAXIMUM]`?
pub fn is_valid(priority: Priority) -> bool {
    (PRIORITY_MINIMUM..=PRIORITY_MAXIMUM).contains(&priority)
}

/// One step up, or `None` at the ceiling
pub fn step_up(priority: Priority) -> Option<Priority> {
    (priority < PRIORITY_MAXIMUM).then(|| priority + 1)
}

/// One step down, or `None` at the floor
pub fn step_down(priority: Priority) -> Option<Priority> {
    (priority > PRIORITY_MINIMUM).then(|| priority - 1)
}
