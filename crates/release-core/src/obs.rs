//! Structured observability hooks for release reconciliation.
//!
//! This module provides:
//! - Release-scoped tracing spans via `ReconcileSpan`
//! - Emission functions for key lifecycle events: pipeline run and binding
//!   creation, rejection, completion, deployment progress, finalization
//!
//! Events are emitted at `info!` level; filter them with `RUST_LOG`.
//! Status conditions on the Release remain the operator-facing record.

use std::fmt::Display;
use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

/// Span scoping one reconciliation pass.
///
/// Entered span guards are not `Send`, so the span is attached to the pass's
/// future instead of being held across awaits.
///
/// # Example
///
/// ```ignore
/// ReconcileSpan::new(&key).wrap(reconciler.pass(&key)).await;
/// // every event in the pass now carries release = "tenant/release-a"
/// ```
pub struct ReconcileSpan {
    span: tracing::Span,
}

impl ReconcileSpan {
    /// Create a span tagged with the release key.
    pub fn new(release: &dyn Display) -> Self {
        Self {
            span: tracing::info_span!("release.reconcile", release = %release),
        }
    }

    /// Run `future` inside the span.
    pub fn wrap<F: Future>(self, future: F) -> Instrumented<F> {
        future.instrument(self.span)
    }
}

/// Emit event: release pipeline run created.
pub fn emit_pipeline_run_created(release: &dyn Display, pipeline_run: &dyn Display) {
    info!(event = "pipeline_run.created", release = %release, pipeline_run = %pipeline_run);
}

/// Emit event: deployment binding created.
pub fn emit_binding_created(release: &dyn Display, binding: &dyn Display) {
    info!(event = "binding.created", release = %release, binding = %binding);
}

/// Emit event: release rejected by validation (warning level).
pub fn emit_release_invalidated(release: &dyn Display, reason: &str, message: &str) {
    warn!(
        event = "release.invalidated",
        release = %release,
        reason = %reason,
        message = %message,
    );
}

/// Emit event: release pipeline run finished.
pub fn emit_release_completed(release: &dyn Display, succeeded: bool) {
    info!(event = "release.completed", release = %release, succeeded = succeeded);
}

/// Emit event: deployment condition projected onto the release.
pub fn emit_deployment_status_changed(release: &dyn Display, status: &str, reason: &str) {
    info!(
        event = "deployment.status_changed",
        release = %release,
        status = %status,
        reason = %reason,
    );
}

/// Emit event: release cleanup done, finalizer removed.
pub fn emit_release_finalized(release: &dyn Display) {
    info!(event = "release.finalized", release = %release);
}

/// Emit event: reconciliation pass finished with the given outcome.
pub fn emit_pass_finished(release: &dyn Display, outcome: &str, duration_ms: u64) {
    info!(
        event = "release.pass_finished",
        release = %release,
        outcome = %outcome,
        duration_ms = duration_ms,
    );
}

/// Emit event: pass abandoned on error, to be retried (warning level).
pub fn emit_pass_error(release: &dyn Display, error: &dyn Display) {
    warn!(event = "release.pass_error", release = %release, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reconcile_span_instruments_future() {
        let value = ReconcileSpan::new(&"tenant/release-a")
            .wrap(async {
                emit_pass_finished(&"tenant/release-a", "done", 3);
                7
            })
            .await;
        assert_eq!(value, 7);
    }
}
