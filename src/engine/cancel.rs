//! Cancellation signal shared between a caller and a running measurement
//!
//! The signal is both pollable (the direct backend checks it between reads on a
//! blocking thread) and awaitable (the async shim races it against the backend).
//! It flips from "running" to "canceled" at most once.

use std::sync::Arc;
use tokio::sync::watch;

/// One-shot, cloneable cancellation flag
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation
    ///
    /// Returns `true` for the request that actually canceled; later requests are
    /// no-ops and return `false`.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|canceled| {
            if *canceled {
                false
            } else {
                *canceled = true;
                true
            }
        })
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation has been requested
    pub async fn canceled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|canceled| *canceled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
