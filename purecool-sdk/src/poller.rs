//! Background environmental telemetry requests
//!
//! The poller thread runs `tick` right away and then once per interval until
//! told to stop. Stopping is a channel hang-up, so the thread wakes at once
//! instead of finishing its sleep.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) struct Poller {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub(crate) fn spawn<F>(interval: Duration, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            tracing::debug!("Telemetry poller started ({:?} interval)", interval);
            loop {
                tick();
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!("Telemetry poller stopped");
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Wake the thread and let it exit without waiting for it
    pub(crate) fn signal_stop(&mut self) {
        self.stop_tx.take();
    }

    /// Stop the thread and wait for it to finish
    pub(crate) fn stop(mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Telemetry poller panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.signal_stop();
    }
}
