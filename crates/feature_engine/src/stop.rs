//! Acquisition-wide stop signal.
//!
//! The flag is polled at the top of every driver call. Blocking waits select on
//! [`StopSignal::cancelled`], which becomes ready for every waiter at once when
//! the trigger sender is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

#[derive(Debug)]
struct StopInner {
    stopped: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    cancelled: Receiver<()>,
}

/// Cloneable stop handle shared by both acquisition threads and all features
#[derive(Debug, Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (trigger, cancelled) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(StopInner {
                stopped: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                cancelled,
            }),
        }
    }

    /// Request stop. Idempotent; wakes every blocked waiter.
    pub fn request_stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::debug!("stop requested");
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Ready (disconnected) once stop was requested, for use in `select!`
    pub fn cancelled(&self) -> &Receiver<()> {
        &self.inner.cancelled
    }

    /// Sleep for `duration` unless stopped first.
    ///
    /// Returns `true` when the full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        matches!(
            self.inner.cancelled.recv_timeout(duration),
            Err(RecvTimeoutError::Timeout)
        )
    }
}
