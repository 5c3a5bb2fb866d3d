//! Cooperative cancellation shared between the CLI and the executor

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation flag
///
/// Every clone observes the same flag. Once cancelled it stays cancelled.
///
/// # Example
/// ```
/// use stackdown_core::CancelToken;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let token = CancelToken::new();
/// let waiter = token.clone();
///
/// token.cancel();
/// waiter.cancelled().await;
/// assert!(waiter.is_cancelled());
/// # });
/// ```
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Trip the token; wakes every waiter
    pub fn cancel(&self) {
        self.tx.send_replace(true);
        tracing::debug!("Cancellation requested");
    }

    /// Whether [`CancelToken::cancel`] was called on any clone
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender lives as long as any clone, so this never completes
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
