//! Global atomic counters for controller observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. after each controller batch).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    passes: AtomicU64,
    pipeline_runs_created: AtomicU64,
    bindings_created: AtomicU64,
    validation_failures: AtomicU64,
    requeues: AtomicU64,
    errors: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            passes: AtomicU64::new(0),
            pipeline_runs_created: AtomicU64::new(0),
            bindings_created: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            requeues: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn inc_passes(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "passes", "counter incremented");
    }

    pub fn inc_pipeline_runs_created(&self) {
        self.pipeline_runs_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pipeline_runs_created", "counter incremented");
    }

    pub fn inc_bindings_created(&self) {
        self.bindings_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "bindings_created", "counter incremented");
    }

    pub fn inc_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validation_failures", "counter incremented");
    }

    pub fn inc_requeues(&self) {
        self.requeues.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "requeues", "counter incremented");
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "errors", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a batch, daemon shutdown)
    /// rather than on every increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            passes = self.passes(),
            pipeline_runs_created = self.pipeline_runs_created(),
            bindings_created = self.bindings_created(),
            validation_failures = self.validation_failures(),
            requeues = self.requeues(),
            errors = self.errors(),
        );
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn pipeline_runs_created(&self) -> u64 {
        self.pipeline_runs_created.load(Ordering::Relaxed)
    }

    pub fn bindings_created(&self) -> u64 {
        self.bindings_created.load(Ordering::Relaxed)
    }

    pub fn validation_failures(&self) -> u64 {
        self.validation_failures.load(Ordering::Relaxed)
    }

    pub fn requeues(&self) -> u64 {
        self.requeues.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.passes.store(0, Ordering::Relaxed);
        self.pipeline_runs_created.store(0, Ordering::Relaxed);
        self.bindings_created.store(0, Ordering::Relaxed);
        self.validation_failures.store(0, Ordering::Relaxed);
        self.requeues.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.passes(), 0);
        m.inc_passes();
        m.inc_passes();
        assert_eq!(m.passes(), 2);

        m.inc_pipeline_runs_created();
        assert_eq!(m.pipeline_runs_created(), 1);

        m.inc_requeues();
        m.inc_errors();
        m.inc_errors();
        assert_eq!(m.requeues(), 1);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_passes();
        m.inc_bindings_created();
        m.inc_validation_failures();
        m.reset();
        assert_eq!(m.passes(), 0);
        assert_eq!(m.bindings_created(), 0);
        assert_eq!(m.validation_failures(), 0);
    }
}
