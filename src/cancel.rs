//! Cooperative cancellation token.
//!
//! `quit()` flips a watch channel; every blocking call in the pipeline
//! holds a `CancelToken` and either polls `is_cancelled()` between steps
//! or `select!`s on `cancelled()` against its next suspension point.

use tokio::sync::watch;

/// Owning side. Held by the pipeline controller.
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

/// Cloneable observer side, passed into every blocking call.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelSource {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelToken { rx })
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is signalled. A dropped source counts
    /// as cancelled so orphaned workers always unwind.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
