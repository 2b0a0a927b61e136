//! Cooperative shutdown.
//!
//! A [`ShutdownHandle`] is a clonable token both loops watch between
//! iterations and inside their blocking waits. An interrupt is a normal
//! termination path, never an error; each loop releases its own client
//! handle on the way out and nothing signals the other loop directly.

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Which signal triggered shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (ctrl-c).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Clonable shutdown token backed by a watch channel.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
}

impl ShutdownHandle {
    /// Creates an untriggered handle.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self { sender, receiver }
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown is requested. Usable from any clone, any task.
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow() {
                return;
            }
            if receiver.changed().await.is_err() {
                // All senders gone counts as shutdown.
                return;
            }
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() -> std::io::Result<ShutdownSignal> {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await?;
        Ok::<_, std::io::Error>(ShutdownSignal::Interrupt)
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<_, std::io::Error>(ShutdownSignal::Terminate)
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<ShutdownSignal>>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}

/// Spawns a task that triggers the handle on the first interrupt signal.
///
/// If the signal handlers cannot be installed the handle is triggered
/// immediately, failing safe instead of leaving the process unstoppable.
pub fn spawn_signal_listener(handle: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(signal) => {
                tracing::info!(%signal, "interrupt received, shutting down");
            }
            Err(err) => {
                tracing::error!("failed to install signal handlers: {:#?}", err);
            }
        }
        handle.trigger();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_is_visible_to_clones() {
        let handle = ShutdownHandle::new();
        let clone = handle.clone();

        assert!(!clone.is_triggered());
        handle.trigger();
        assert!(clone.is_triggered());
    }

    #[tokio::test]
    async fn triggered_future_unblocks_waiters() {
        let handle = ShutdownHandle::new();
        let waiter = handle.clone();

        let task = tokio::spawn(async move { waiter.triggered().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should unblock")
            .expect("");
    }

    #[tokio::test]
    async fn triggered_resolves_immediately_when_already_triggered() {
        let handle = ShutdownHandle::new();
        handle.trigger();
        tokio::time::timeout(Duration::from_millis(50), handle.triggered())
            .await
            .expect("should not wait");
    }
}
