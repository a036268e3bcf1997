use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Gate is a one-shot signal. Once fired it stays fired, and any number of
/// tasks may wait on it without touching the owner's state lock.
#[derive(Debug, Default)]
pub(crate) struct Gate {
    fired: AtomicBool,
    notify: Notify,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Gate::default()
    }

    /// fire opens the gate. Returns true only for the call that opened it.
    pub(crate) fn fire(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// wait resolves once the gate has been fired.
    pub(crate) async fn wait(&self) {
        loop {
            // register before checking the flag so a concurrent fire is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }
}
