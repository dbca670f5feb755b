//! Delivery worker: the thread that drives a connection's event loop
//!
//! Transport events are the session state machine's only input while a
//! connection is up. The worker turns them into status transitions, snapshot
//! updates and listener calls.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::session::{ConnectionStatus, Inner};
use crate::transport::{EventLoop, TransportClient, TransportEvent};

/// Spawn the worker for one connection
///
/// `connect_tx` receives the connect result exactly once, or is dropped if
/// the event loop ends before the broker answers. Once `epoch` is no longer
/// current the worker stops touching the session and exits at its next event.
pub(crate) fn spawn_delivery_worker(
    inner: Arc<Inner>,
    epoch: u64,
    client: Arc<dyn TransportClient>,
    mut events: Box<dyn EventLoop>,
    connect_tx: mpsc::Sender<bool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut connect_tx = Some(connect_tx);

        while let Some(event) = events.next_event() {
            match event {
                TransportEvent::ConnAck(0) => {
                    let accepted = inner
                        .in_epoch(epoch, || {
                            if let Err(e) = client.subscribe(inner.status_topic()) {
                                tracing::warn!(
                                    "Failed to subscribe to {}: {}",
                                    inner.status_topic(),
                                    e
                                );
                            }
                            inner.set_status(ConnectionStatus::Connected);
                            inner.start_poller();
                        })
                        .is_some();
                    notify(&mut connect_tx, accepted);
                    if !accepted {
                        tracing::debug!("Ignoring connection accepted after it was abandoned");
                        break;
                    }
                }
                TransportEvent::ConnAck(code) => {
                    tracing::warn!("Broker refused connection (code {})", code);
                    inner.in_epoch(epoch, || inner.set_status(ConnectionStatus::Disconnected));
                    notify(&mut connect_tx, false);
                    break;
                }
                TransportEvent::Message { topic, payload } => {
                    if !inner.is_current(epoch) {
                        break;
                    }
                    inner.deliver(&topic, &payload);
                }
                TransportEvent::Closed(reason) => {
                    tracing::info!("Broker connection closed: {}", reason);
                    break;
                }
            }
        }

        inner.in_epoch(epoch, || {
            inner.signal_poller_stop();
            inner.set_status(ConnectionStatus::Disconnected);
        });
        notify(&mut connect_tx, false);
        tracing::debug!("Delivery worker exiting");
    })
}

fn notify(connect_tx: &mut Option<mpsc::Sender<bool>>, connected: bool) {
    if let Some(tx) = connect_tx.take() {
        // The caller may have given up waiting
        let _ = tx.send(connected);
    }
}
