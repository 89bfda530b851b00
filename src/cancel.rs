use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Cooperative cancellation token shared between the dispatch loop, the
/// event source, and whoever decides the session is over.
///
/// Cancellation is one-way: once cancelled, a token never becomes live
/// again. Clones share the same underlying state.
///
/// Besides the usual flag check, the token exposes [`done`](Self::done),
/// a receiver that becomes ready (disconnected) at the moment of
/// cancellation. That is what lets the dispatch loop block in a
/// `select!` over "next event or cancellation" without polling.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    // Dropping this sender is what wakes `done`. Kept behind a lock so
    // any clone can cancel.
    keepalive: Arc<Mutex<Option<Sender<()>>>>,
    done: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            keepalive: Arc::new(Mutex::new(Some(tx))),
            done: rx,
        }
    }

    /// Request cancellation. Safe to call from any thread, any number of
    /// times; only the first call changes anything.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.keepalive.lock().unwrap().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that disconnects when the token is cancelled. Nothing is
    /// ever sent on it; its only purpose is to make cancellation
    /// selectable alongside an event channel.
    pub fn done(&self) -> &Receiver<()> {
        &self.done
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
