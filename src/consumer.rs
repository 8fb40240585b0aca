//! Consumer actions run for decoded packets.
//!
//! Each registry entry pairs a decoder with one consumer. The dispatcher has already
//! filtered out invalid packets, so consumers only see packets to act on.

use tracing::debug;

use crate::{BridgeError, Result};
use crate::sink::{CommandSink, ErrorSink};
use crate::types::DecodedPacket;

/// Command that homes the machine; delivering it counts as an actioned packet.
pub const DEFAULT_SENTINEL_COMMAND: &str = "G28";

/// What a consumer did with a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Command handed to the command sink
    Delivered { command: String, sentinel: bool },
    /// Packet handed to the error sink
    ErrorReported,
    /// Packet acknowledged by a reserved consumer
    Reserved,
}

/// Side effect performed for one packet type.
pub trait PacketConsumer: Send {
    fn consume(&mut self, packet: &DecodedPacket) -> Result<Action>;
}

/// Forwards COMMAND text to a command sink.
pub struct CommandForwarder {
    sink: Box<dyn CommandSink>,
    sentinel: String,
}

impl CommandForwarder {
    /// The sentinel is compared against stripped command text, so it is stripped too.
    pub fn new(sink: Box<dyn CommandSink>, sentinel: impl Into<String>) -> Self {
        let sentinel = sentinel.into();
        Self { sink, sentinel: sentinel.trim().to_string() }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }
}

impl PacketConsumer for CommandForwarder {
    fn consume(&mut self, packet: &DecodedPacket) -> Result<Action> {
        let command = packet.command().ok_or_else(|| {
            BridgeError::invalid_packet(
                packet.type_id(),
                format!("{} packet carries no command text", packet.packet_type()),
            )
        })?;
        self.sink.send(command)?;

        let sentinel = command == self.sentinel;
        debug!(command, sentinel, "Command forwarded");
        Ok(Action::Delivered { command: command.to_string(), sentinel })
    }
}

/// Hands ERROR packets to an error sink.
pub struct ErrorReporter {
    sink: Box<dyn ErrorSink>,
}

impl ErrorReporter {
    pub fn new(sink: Box<dyn ErrorSink>) -> Self {
        Self { sink }
    }
}

impl PacketConsumer for ErrorReporter {
    fn consume(&mut self, packet: &DecodedPacket) -> Result<Action> {
        self.sink.report(packet)?;
        Ok(Action::ErrorReported)
    }
}

/// Placeholder for packet types that have no consumer yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReservedConsumer;

impl PacketConsumer for ReservedConsumer {
    fn consume(&mut self, packet: &DecodedPacket) -> Result<Action> {
        debug!(packet_type = %packet.packet_type(), "Reserved packet acknowledged");
        Ok(Action::Reserved)
    }
}
