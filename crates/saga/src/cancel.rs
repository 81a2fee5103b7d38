//! Cooperative cancellation shared by the tasks of a saga.
//!
//! A [`CancelSignal`] is handed to [`SagaCoordinator::fulfill_with_cancel`]
//! by the caller. Each fan-out stage derives a child signal: the first fatal
//! error inside the stage cancels the child so sibling tasks can stop
//! waiting, while the caller's signal is left untouched.
//!
//! [`SagaCoordinator::fulfill_with_cancel`]: crate::SagaCoordinator::fulfill_with_cancel

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::select_all;
use tokio::sync::watch;

/// A cloneable cancellation flag.
///
/// Cancelling a signal also cancels every child derived from it; cancelling
/// a child does not reach its parent.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    // Own flag last; the rest belong to ancestors.
    flags: Vec<Arc<watch::Sender<bool>>>,
}

impl CancelSignal {
    /// Creates a signal that is not cancelled.
    pub fn new() -> Self {
        Self {
            flags: vec![Arc::new(watch::Sender::new(false))],
        }
    }

    /// Derives a signal that fires when either it or `self` is cancelled.
    pub fn child(&self) -> Self {
        let mut flags = self.flags.clone();
        flags.push(Arc::new(watch::Sender::new(false)));
        Self { flags }
    }

    /// Cancels this signal and its children.
    pub fn cancel(&self) {
        if let Some(own) = self.flags.last() {
            own.send_replace(true);
        }
    }

    /// Returns true if this signal or an ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flags.iter().any(|flag| *flag.borrow())
    }

    /// Completes once this signal or an ancestor is cancelled.
    pub async fn cancelled(&self) {
        let waits = self.flags.iter().map(|flag| {
            let mut rx = flag.subscribe();
            Box::pin(async move {
                // The sender outlives the receiver, so this only returns on cancel.
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            })
        });
        select_all(waits).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a store call made under a timeout and a cancel signal.
#[derive(Debug)]
pub(crate) enum Guarded<T> {
    /// The call finished, successfully or not.
    Completed(store::Result<T>),
    /// The signal fired before the call finished; the call was dropped.
    Cancelled,
}

/// Bounds a store call by `timeout`.
///
/// Elapsed calls come back as `StoreError::Timeout`.
pub(crate) async fn with_timeout<T, F>(timeout: Duration, call: F) -> store::Result<T>
where
    F: Future<Output = store::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            metrics::counter!("store_timeouts_total").increment(1);
            Err(store::StoreError::Timeout(timeout))
        }
    }
}

/// Bounds a read-only store call by `timeout` and drops it early if `cancel`
/// fires. Only use this for calls that are safe to abandon mid-flight.
pub(crate) async fn abandonable<T, F>(timeout: Duration, cancel: &CancelSignal, call: F) -> Guarded<T>
where
    F: Future<Output = store::Result<T>>,
{
    if cancel.is_cancelled() {
        return Guarded::Cancelled;
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Guarded::Cancelled,
        result = with_timeout(timeout, call) => Guarded::Completed(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_signal_is_not_cancelled() {
        assert!(!CancelSignal::new().is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        signal.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn parent_cancels_child_but_not_the_reverse() {
        let parent = CancelSignal::new();
        let child = parent.child();
        let sibling = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());

        parent.cancel();
        assert!(sibling.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let signal = CancelSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn child_wakes_on_parent_cancel() {
        let parent = CancelSignal::new();
        let child = parent.child();

        let waiter = tokio::spawn(async move { child.cancelled().await });
        parent.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("child should observe parent cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn with_timeout_maps_elapsed_to_store_timeout() {
        let result: store::Result<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(store::StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn abandonable_stops_on_cancel() {
        let signal = CancelSignal::new();
        let canceller = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let outcome = abandonable(Duration::from_secs(5), &signal, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1)
        })
        .await;

        assert!(matches!(outcome, Guarded::Cancelled));
    }

    #[tokio::test]
    async fn abandonable_skips_call_when_already_cancelled() {
        let signal = CancelSignal::new();
        signal.cancel();

        let outcome = abandonable(Duration::from_secs(1), &signal, async { Ok(1) }).await;
        assert!(matches!(outcome, Guarded::Cancelled));
    }
}
