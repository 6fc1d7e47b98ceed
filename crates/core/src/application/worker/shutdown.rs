// Worker Shutdown Token

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Why the relay was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// External interrupt (Ctrl+C / SIGTERM)
    Interrupt,
    /// No message received within the idle window
    IdleTimeout,
    /// All workers exited on their own (source drained)
    Completed,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "interrupt"),
            ShutdownReason::IdleTimeout => write!(f, "timeout"),
            ShutdownReason::Completed => write!(f, "completed"),
        }
    }
}

/// Shutdown signal for graceful termination
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownToken {
    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Reason of the first (and only effective) shutdown request
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.rx.borrow()
    }

    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        if self.rx.wait_for(Option::is_some).await.is_err() {
            // Every sender is gone without firing: shutdown can no longer happen
            std::future::pending::<()>().await;
        }
    }
}

/// Shutdown sender.
///
/// Cloneable so the interrupt listener, the idle watchdog and the controller
/// can all hold one. Only the first call to [`ShutdownSender::shutdown`] has
/// an effect.
#[derive(Clone, Debug)]
pub struct ShutdownSender {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownSender {
    /// Signal shutdown to all workers; returns false if it was already signalled
    pub fn shutdown(&self, reason: ShutdownReason) -> bool {
        let fired = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if fired {
            info!(%reason, "Starting graceful shutdown");
        } else {
            debug!(%reason, "Shutdown already signalled, ignoring");
        }
        fired
    }

    /// Create another token observing this signal
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(None);
    (ShutdownSender { tx: Arc::new(tx) }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_exactly_once() {
        let (tx, token) = shutdown_channel();
        assert!(!token.is_shutdown());

        assert!(tx.shutdown(ShutdownReason::IdleTimeout));
        assert!(!tx.clone().shutdown(ShutdownReason::Interrupt));

        assert!(token.is_shutdown());
        assert_eq!(token.reason(), Some(ShutdownReason::IdleTimeout));
    }

    #[tokio::test]
    async fn test_wait_wakes_all_tokens() {
        let (tx, token) = shutdown_channel();
        let mut first = token.clone();
        let mut second = tx.token();

        let waiter = tokio::spawn(async move {
            first.wait().await;
            second.wait().await;
        });
        tx.shutdown(ShutdownReason::Interrupt);

        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        tokio_test::assert_ok!(joined.expect("waiters should be woken"));
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_after_fire() {
        let (tx, mut token) = shutdown_channel();
        tx.shutdown(ShutdownReason::Completed);
        token.wait().await;
        assert_eq!(token.reason(), Some(ShutdownReason::Completed));
    }
}
