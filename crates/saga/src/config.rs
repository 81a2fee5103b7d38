//! Saga runtime settings.

use std::time::Duration;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Settings injected into the [`SagaCoordinator`](crate::SagaCoordinator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaConfig {
    /// Upper bound on every individual inventory/order store call. A call
    /// that exceeds it fails with `StoreError::Timeout`.
    pub store_timeout: Duration,
}

impl SagaConfig {
    /// Returns a config with the given store timeout.
    pub fn with_store_timeout(store_timeout: Duration) -> Self {
        Self { store_timeout }
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}
