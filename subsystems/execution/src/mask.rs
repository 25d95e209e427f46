//! # Interrupt Mask
//!
//! The single mutual-exclusion primitive of the scheduler. Disabling the mask
//! grants exclusive access to all scheduling state until the returned guard
//! restores the previous status, mirroring a `disable()`/`restore(status)`
//! pair on a uniprocessor.
//!
//! ```text
//!   let outer = mask.disable();     enabled  -> disabled
//!   {
//!       let inner = mask.disable(); disabled -> disabled
//!   }                               restore: disabled
//!   drop(outer);                    restore: enabled
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// Process-wide preemption mask
#[derive(Debug)]
pub struct InterruptMask {
    disabled: AtomicBool,
}

impl InterruptMask {
    /// Create a mask in the enabled state
    pub const fn new() -> Self {
        Self {
            disabled: AtomicBool::new(false),
        }
    }

    /// Disable preemption, returning a guard that restores the prior status
    pub fn disable(&self) -> MaskGuard<'_> {
        let was_disabled = self.disabled.swap(true, Ordering::AcqRel);
        MaskGuard {
            mask: self,
            was_disabled,
        }
    }

    /// Is preemption currently disabled?
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Run `f` with preemption disabled
    pub fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.disable();
        f()
    }
}

impl Default for InterruptMask {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the mask to its previous status when dropped
#[derive(Debug)]
#[must_use = "dropping the guard immediately restores the mask"]
pub struct MaskGuard<'a> {
    mask: &'a InterruptMask,
    was_disabled: bool,
}

impl MaskGuard<'_> {
    /// Status the mask had before this guard disabled it
    pub fn was_disabled(&self) -> bool {
        self.was_disabled
    }
}

impl Drop for MaskGuard<'_> {
    fn drop(&mut self) {
        self.mask.disabled.store(self.was_disabled, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_restore() {
        let mask = InterruptMask::new();
        assert!(!mask.is_disabled());

        let guard = mask.disable();
        assert!(mask.is_disabled());
        assert!(!guard.was_disabled());

        drop(guard);
        assert!(!mask.is_disabled());
    }

    #[test]
    fn test_nested_guards() {
        let mask = InterruptMask::new();
        let outer = mask.disable();
        {
            let inner = mask.disable();
            assert!(inner.was_disabled());
            assert!(mask.is_disabled());
        }
        // Inner restore must not re-enable
        assert!(mask.is_disabled());
        drop(outer);
        assert!(!mask.is_disabled());
    }

    #[test]
    fn test_with() {
        let mask = InterruptMask::new();
        let seen = mask.with(|| mask.is_disabled());
        assert!(seen);
        assert!(!mask.is_disabled());
    }
}
