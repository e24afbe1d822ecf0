//! Stop/acknowledge handshake between the trainer and a polling worker.
//!
//! The worker polls [`RunSignal::is_running`] once per loop iteration and
//! calls [`RunSignal::acknowledge`] after it has observed the stop request.
//! The trainer clears the flag, waits its grace period, and checks for the
//! acknowledgement before joining.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared run flag plus a one-shot acknowledgement channel.
#[derive(Clone, Debug)]
pub struct RunSignal {
    running: Arc<AtomicBool>,
    ack_tx: Sender<()>,
    ack_rx: Receiver<()>,
}

impl RunSignal {
    /// Create a signal in the running state.
    pub fn new() -> Self {
        let (ack_tx, ack_rx) = bounded(1);
        Self {
            running: Arc::new(AtomicBool::new(true)),
            ack_tx,
            ack_rx,
        }
    }

    /// Worker side: should the loop keep going?
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Trainer side: ask the worker to stop. Never blocks.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Worker side: report that the stop request was observed.
    ///
    /// Only the first acknowledgement is kept.
    pub fn acknowledge(&self) {
        let _ = self.ack_tx.try_send(());
    }

    /// Trainer side: has the worker acknowledged? Does not block.
    pub fn try_acknowledged(&self) -> bool {
        match self.ack_rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    /// Trainer side: wait up to `timeout` for the acknowledgement.
    pub fn wait_acknowledged(&self, timeout: Duration) -> bool {
        match self.ack_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}
