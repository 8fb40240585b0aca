//! Test utilities shared by unit tests and benchmarks
//!
//! Recording sinks that keep what the dispatcher hands them, plus a sink that
//! always fails, so tests can observe consumer actions without touching the
//! filesystem.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::{Arc, Mutex};

use crate::sink::{CommandSink, ErrorSink};
use crate::types::DecodedPacket;
use crate::{BridgeError, Result};

/// Command sink that records every command it receives.
///
/// Clones share the same record, so a test can keep one clone and box the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingCommandSink {
    commands: Arc<Mutex<Vec<String>>>,
}

impl RecordingCommandSink {
    /// Commands received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|commands| commands.clone()).unwrap_or_default()
    }
}

impl CommandSink for RecordingCommandSink {
    fn send(&mut self, command: &str) -> Result<()> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.to_string());
        }
        Ok(())
    }
}

/// Error sink that records every reported packet.
#[derive(Debug, Clone, Default)]
pub struct RecordingErrorSink {
    packets: Arc<Mutex<Vec<DecodedPacket>>>,
}

impl RecordingErrorSink {
    /// Number of packets reported so far.
    pub fn count(&self) -> usize {
        self.packets.lock().map(|packets| packets.len()).unwrap_or_default()
    }

    pub fn packets(&self) -> Vec<DecodedPacket> {
        self.packets.lock().map(|packets| packets.clone()).unwrap_or_default()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&mut self, packet: &DecodedPacket) -> Result<()> {
        if let Ok(mut packets) = self.packets.lock() {
            packets.push(packet.clone());
        }
        Ok(())
    }
}

/// Command sink that rejects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCommandSink;

impl CommandSink for FailingCommandSink {
    fn send(&mut self, _command: &str) -> Result<()> {
        Err(BridgeError::sink_failed("sink unavailable", None))
    }
}
