//! Quota-exceeded notifications.
//!
//! Writes that fail with [`CacheError::QuotaExceeded`](crate::CacheError)
//! are reported here so the host can free space, independently of whether
//! the failing operation itself surfaces the error.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Registered quota-error callbacks. Clones share the same list.
#[derive(Clone, Default)]
pub struct QuotaErrorCallbacks {
    callbacks: Arc<RwLock<Vec<Callback>>>,
}

impl QuotaErrorCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to run on every quota error.
    pub async fn register<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks.write().await.push(Arc::new(callback));
    }

    /// Run every callback, in registration order. Returns how many ran.
    pub async fn run(&self) -> usize {
        let callbacks = self.callbacks.read().await.clone();
        debug!(count = callbacks.len(), "Running quota error callbacks");
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }
}

impl std::fmt::Debug for QuotaErrorCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaErrorCallbacks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_callbacks_run_in_order() {
        let callbacks = QuotaErrorCallbacks::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        callbacks
            .register(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let h = hits.clone();
        callbacks
            .clone()
            .register(move || {
                h.fetch_add(10, Ordering::SeqCst);
            })
            .await;

        assert_eq!(callbacks.run().await, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }
}
