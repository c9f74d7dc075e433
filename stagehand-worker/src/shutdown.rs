//! Cooperative shutdown token.
//!
//! The hosting process holds the [`ShutdownHandle`] and flips it on signal
//! receipt; the worker holds the [`ShutdownToken`] and reads it only at safe
//! suspension points. No global mutable state, no forced cancellation.

use tokio::sync::watch;

/// Flips the token. Held by the hosting process (signal handler, tests).
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Read side, cloneable into every task that needs to observe shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Non-blocking check, for loop-iteration boundaries.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested. If the handle is dropped without
    /// ever requesting shutdown, this pends forever.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a connected handle/token pair.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownToken { rx })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
