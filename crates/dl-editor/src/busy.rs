//! Busy-state store: one process-wide boolean, observed by the view layer.
//!
//! Backed by a `watch` channel: writes are last-write-wins, readers get
//! push notifications and only ever see `true` or `false`.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct BusyFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl BusyFlag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Last write wins. Observers are notified only on an actual change.
    pub fn set(&self, busy: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != busy;
            *current = busy;
            changed
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Flip `false → true` atomically. `None` if already busy.
    ///
    /// The returned guard clears the flag when dropped, so every acquired
    /// pipeline releases it exactly once whichever way it ends.
    #[must_use]
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        let acquired = self.tx.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        acquired.then(|| BusyGuard { flag: self.clone() })
    }

    /// Resolve once the flag reads `false`.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // Sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|busy| !*busy).await;
    }
}

impl Default for BusyFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    flag: BusyFlag,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
