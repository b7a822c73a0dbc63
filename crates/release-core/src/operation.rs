//! Chain-control results returned by every reconcile operation.
//!
//! Operations never raise: expected control paths (stop, requeue) are values.
//! A failed store call becomes `RequeueWithError` and the pass is abandoned.

use crate::domain::{ReleaseError, Result};

/// Outcome of one ensure-operation.
#[derive(Debug)]
pub enum OperationResult {
    /// Run the next operation in the chain.
    Continue,
    /// End the pass successfully.
    Stop,
    /// End the pass and schedule another one right away.
    Requeue,
    /// End the pass and retry it with backoff.
    RequeueWithError(ReleaseError),
}

impl OperationResult {
    pub fn continue_processing() -> Self {
        OperationResult::Continue
    }

    pub fn stop() -> Self {
        OperationResult::Stop
    }

    pub fn requeue() -> Self {
        OperationResult::Requeue
    }

    pub fn requeue_on_error(err: impl Into<ReleaseError>) -> Self {
        OperationResult::RequeueWithError(err.into())
    }

    /// `Ok` continues the chain; `Err` requeues with the error.
    pub fn requeue_on_error_or_continue(result: Result<()>) -> Self {
        match result {
            Ok(()) => OperationResult::Continue,
            Err(err) => OperationResult::RequeueWithError(err),
        }
    }

    /// `Ok` stops the chain; `Err` requeues with the error.
    pub fn requeue_on_error_or_stop(result: Result<()>) -> Self {
        match result {
            Ok(()) => OperationResult::Stop,
            Err(err) => OperationResult::RequeueWithError(err),
        }
    }

    /// Whether the chain must end after this result.
    pub fn cancels_chain(&self) -> bool {
        !matches!(self, OperationResult::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use release_store::StoreError;

    fn transient() -> ReleaseError {
        ReleaseError::Store(StoreError::Unavailable("reset".to_string()))
    }

    #[test]
    fn ok_maps_per_call_site() {
        assert!(matches!(
            OperationResult::requeue_on_error_or_continue(Ok(())),
            OperationResult::Continue
        ));
        assert!(matches!(
            OperationResult::requeue_on_error_or_stop(Ok(())),
            OperationResult::Stop
        ));
    }

    #[test]
    fn error_always_requeues() {
        assert!(matches!(
            OperationResult::requeue_on_error_or_continue(Err(transient())),
            OperationResult::RequeueWithError(_)
        ));
        assert!(matches!(
            OperationResult::requeue_on_error_or_stop(Err(transient())),
            OperationResult::RequeueWithError(_)
        ));
    }

    #[test]
    fn only_continue_keeps_the_chain_going() {
        assert!(!OperationResult::continue_processing().cancels_chain());
        assert!(OperationResult::stop().cancels_chain());
        assert!(OperationResult::requeue().cancels_chain());
        assert!(OperationResult::requeue_on_error(transient()).cancels_chain());
    }
}
