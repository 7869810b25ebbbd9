use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use eyre::{Result, WrapErr};
use tokio::{signal, sync::broadcast};

/// Why the server is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Triggered from inside the process
    Requested,
}

/// Fans a single shutdown event out to every subscriber.
///
/// The serve loop waits on [`GracefulShutdown::wait_for_shutdown_signal`]
/// while [`GracefulShutdown::run_signal_handler`] listens for OS signals.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            shutdown_tx,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a receiver for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.shutdown_tx.subscribe()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Relaxed)
    }

    /// Start shutdown; later calls are ignored.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            tracing::info!("Shutdown initiated: {:?}", reason);
            // No subscribers just means nobody is waiting yet.
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::debug!("Shutdown already initiated, ignoring {:?}", reason);
        }
    }

    /// Wait for SIGINT or SIGTERM and trigger shutdown.
    pub async fn run_signal_handler(&self) -> Result<()> {
        let terminate = wait_for_sigterm();
        tokio::pin!(terminate);

        tokio::select! {
            result = signal::ctrl_c() => {
                result.wrap_err("Failed to listen for Ctrl+C")?;
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                self.trigger_shutdown(ShutdownReason::Interrupt);
            }
            result = &mut terminate => {
                result?;
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                self.trigger_shutdown(ShutdownReason::Terminate);
            }
        }
        Ok(())
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        let mut receiver = self.subscribe();
        if self.is_shutdown_initiated() {
            return ShutdownReason::Requested;
        }
        match receiver.recv().await {
            Ok(reason) => reason,
            Err(_) => {
                tracing::warn!("Shutdown channel closed unexpectedly");
                ShutdownReason::Requested
            }
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm =
        signal(SignalKind::terminate()).wrap_err("Failed to register SIGTERM handler")?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    // Only Ctrl+C exists off Unix.
    std::future::pending::<()>().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[test]
    fn test_graceful_shutdown_creation() {
        let shutdown = GracefulShutdown::new();
        assert!(!shutdown.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = GracefulShutdown::new();
        let mut receiver1 = shutdown.subscribe();
        let mut receiver2 = shutdown.subscribe();

        shutdown.trigger_shutdown(ShutdownReason::Requested);
        assert!(shutdown.is_shutdown_initiated());

        assert_eq!(receiver1.try_recv().unwrap(), ShutdownReason::Requested);
        assert_eq!(receiver2.try_recv().unwrap(), ShutdownReason::Requested);
    }

    #[tokio::test]
    async fn test_only_first_trigger_is_sent() {
        let shutdown = GracefulShutdown::new();
        let mut receiver = shutdown.subscribe();

        shutdown.trigger_shutdown(ShutdownReason::Terminate);
        shutdown.trigger_shutdown(ShutdownReason::Interrupt);

        assert_eq!(receiver.try_recv().unwrap(), ShutdownReason::Terminate);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_signal() {
        let shutdown = GracefulShutdown::new();
        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_shutdown_signal().await });

        tokio::task::yield_now().await;
        shutdown.trigger_shutdown(ShutdownReason::Terminate);

        let reason = timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            reason,
            ShutdownReason::Terminate | ShutdownReason::Requested
        ));
    }

    #[tokio::test]
    async fn test_wait_after_trigger_returns_immediately() {
        let shutdown = GracefulShutdown::new();
        shutdown.trigger_shutdown(ShutdownReason::Interrupt);
        let reason = timeout(Duration::from_secs(1), shutdown.wait_for_shutdown_signal())
            .await
            .unwrap();
        assert_eq!(reason, ShutdownReason::Requested);
    }
}
