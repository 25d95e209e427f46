//! # Scheduler Configuration
//!
//! Runtime knobs for the donation scheduler. Priority bounds are not
//! configurable; see [`crate::scheduler::priority`].

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Re-verify the donation graph after every mutating call
    pub check_invariants: bool,
    /// Emit `debug` records whenever an effective priority changes
    pub log_donations: bool,
}

impl SchedulerConfig {
    /// Configuration with every option off
    pub const fn minimal() -> Self {
        Self {
            check_invariants: false,
            log_donations: false,
        }
    }

    /// Enable or disable post-mutation invariant checks
    pub const fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    /// Enable or disable donation logging
    pub const fn with_donation_logging(mut self, enabled: bool) -> Self {
        self.log_donations = enabled;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_invariants: cfg!(any(debug_assertions, feature = "debug-graph")),
            log_donations: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SchedulerConfig::minimal()
            .with_invariant_checks(true)
            .with_donation_logging(false);
        assert!(config.check_invariants);
        assert!(!config.log_donations);
    }

    #[test]
    fn test_default_checks_in_debug() {
        let config = SchedulerConfig::default();
        assert_eq!(config.check_invariants, cfg!(debug_assertions) || cfg!(feature = "debug-graph"));
        assert!(config.log_donations);
    }
}
