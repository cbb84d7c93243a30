// Shutdown signal shared by workers and background schedulers

use tokio::sync::watch;

/// Receiving side; cheap to clone, one per task
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested (or the sender is dropped)
    pub async fn wait(&mut self) {
        if self.is_shutdown() {
            return;
        }
        let _ = self.rx.changed().await;
    }
}

pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to every token holder
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_after_shutdown() {
        let (sender, mut token) = shutdown_channel();
        let mut other = token.clone();
        assert!(!token.is_shutdown());

        sender.shutdown();
        token.wait().await;
        other.wait().await;
        assert!(other.is_shutdown());
    }
}
