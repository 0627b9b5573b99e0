//! Shutdown coordination
//!
//! A shutdown request does not interrupt work in progress. The cycle runner
//! checks the flag between domains; the scheduler awaits it alongside its
//! trigger queue.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared shutdown flag that can also be awaited.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown
    pub fn request_shutdown(&self) {
        if !self.tx.send_replace(true) {
            info!("Shutdown requested");
        }
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until shutdown is requested. Returns immediately if it already was.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_shutdown_flag() {
        let coordinator = ShutdownCoordinator::new();

        assert!(!coordinator.is_shutdown_requested());

        coordinator.request_shutdown();
        coordinator.request_shutdown();

        assert!(coordinator.is_shutdown_requested());
        assert!(coordinator.clone().is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_wait_wakes_on_request() {
        let coordinator = ShutdownCoordinator::new();
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        coordinator.request_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_after_request_returns() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.request_shutdown();
        tokio::time::timeout(Duration::from_secs(1), coordinator.wait())
            .await
            .unwrap();
    }
}
