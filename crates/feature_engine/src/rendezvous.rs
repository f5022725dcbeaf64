//! Response rendezvous between a `need_response` signal node and its data node.
//!
//! Each pair shares a single-slot channel. The data side deposits the result of
//! every `data_main`; the signal side blocks until a value arrives or the
//! acquisition stops.

use std::time::Instant;

use contracts::Value;
use crossbeam_channel::{select, Receiver, Sender, TrySendError};

use crate::StopSignal;

/// Data-side half of a rendezvous
#[derive(Debug, Clone)]
pub struct ResponseSender {
    tx: Sender<Value>,
}

/// Signal-side half of a rendezvous
#[derive(Debug)]
pub struct ResponseReceiver {
    rx: Receiver<Value>,
}

/// Wait released by a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Create a single-slot response channel
pub fn response_slot() -> (ResponseSender, ResponseReceiver) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (ResponseSender { tx }, ResponseReceiver { rx })
}

impl ResponseSender {
    /// Deposit a response without blocking.
    ///
    /// Returns `false` when the slot still holds an unconsumed response.
    pub fn send(&self, value: Value) -> bool {
        match self.tx.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("previous response not consumed, dropping new response");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl ResponseReceiver {
    /// Block until the data side responds or stop is requested
    pub fn wait(&self, stop: &StopSignal) -> Result<Value, Cancelled> {
        if stop.is_stopped() {
            return Err(Cancelled);
        }
        let start = Instant::now();
        let value = select! {
            recv(self.rx) -> msg => msg.map_err(|_| Cancelled)?,
            recv(stop.cancelled()) -> _ => return Err(Cancelled),
        };
        tracing::trace!(waited_us = start.elapsed().as_micros() as u64, "response received");
        Ok(value)
    }

    /// Drop a stale response (tree reset)
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
