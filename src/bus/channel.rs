//! In-process bus fed through a channel

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use super::BusAdapter;
use crate::{BridgeError, Result};

#[derive(Debug, Default)]
struct BusState {
    configured: AtomicBool,
    stopped: AtomicBool,
}

/// Bus adapter receiving frames pushed through a [`FrameSender`].
///
/// Used when another component already owns the hardware and forwards transfers,
/// and in tests.
#[derive(Debug)]
pub struct ChannelBus {
    rx: mpsc::Receiver<Vec<u8>>,
    state: Arc<BusState>,
}

/// Sending half of a [`ChannelBus`].
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Vec<u8>>,
    state: Arc<BusState>,
}

impl ChannelBus {
    /// Create a bus holding up to `capacity` undelivered frames.
    pub fn new(capacity: usize) -> (Self, FrameSender) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = Arc::new(BusState::default());
        (Self { rx, state: Arc::clone(&state) }, FrameSender { tx, state })
    }
}

impl FrameSender {
    /// Push one raw transfer, waiting while the bus is full.
    pub async fn send(&self, frame: Vec<u8>) -> Result<()> {
        self.tx.send(frame).await.map_err(|_| BridgeError::bus_failed("bus receiver dropped"))
    }

    /// Whether the session has configured the bus.
    pub fn is_configured(&self) -> bool {
        self.state.configured.load(Ordering::Acquire)
    }

    /// Whether the session has stopped the bus.
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Acquire)
    }
}

#[async_trait::async_trait]
impl BusAdapter for ChannelBus {
    async fn configure(&mut self) -> Result<()> {
        self.state.configured.store(true, Ordering::Release);
        debug!("Channel bus configured");
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.state.stopped.load(Ordering::Acquire) {
            return Ok(None);
        }
        // All senders dropped means the bus is closed.
        Ok(self.rx.recv().await)
    }

    async fn stop(&mut self) -> Result<()> {
        self.state.stopped.store(true, Ordering::Release);
        self.rx.close();
        debug!("Channel bus stopped");
        Ok(())
    }
}
