//! Controller configuration.

use std::time::Duration;

/// Tuning for [`crate::controller::ReleaseController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Maximum number of releases reconciled concurrently.
    pub workers: usize,
    /// Interval between full re-lists of every Release.
    pub resync_period: Duration,
    /// First retry delay after a pass fails.
    pub backoff_base: Duration,
    /// Upper bound on the retry delay.
    pub backoff_cap: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            resync_period: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(300),
        }
    }
}

impl ControllerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_resync_period(mut self, resync_period: Duration) -> Self {
        self.resync_period = resync_period;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap.max(base);
        self
    }

    /// Delay before retry number `failures` (1-based), doubling up to the cap.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.resync_period, Duration::from_secs(30));
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.backoff_cap, Duration::from_secs(300));
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let config = ControllerConfig::default();
        assert_eq!(config.backoff_for(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for(2), Duration::from_secs(2));
        assert_eq!(config.backoff_for(4), Duration::from_secs(8));
        assert_eq!(config.backoff_for(20), Duration::from_secs(300));
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn zero_workers_is_clamped() {
        assert_eq!(ControllerConfig::default().with_workers(0).workers, 1);
    }
}
