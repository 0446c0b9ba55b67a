//! Cancellation signal shared by the background loops

use std::time::Duration;
use tokio::sync::watch;

/// Receiving side of the scheduler's stop flag.
///
/// Dropping the sending side counts as a stop request, so loops never outlive
/// their scheduler.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl ShutdownSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A signal that never fires, for one-off runs outside a scheduler
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_shutdown(&self) -> bool {
        self.rx
            .as_ref()
            .is_some_and(|rx| *rx.borrow() || rx.has_changed().is_err())
    }

    /// Resolves once a stop was requested
    pub async fn wait(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.wait_for(|stop| *stop).await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Sleep for `duration`; returns true if interrupted by a stop request
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.wait() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}
