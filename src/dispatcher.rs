//! Per-frame dispatch engine.
//!
//! One call to [`Dispatcher::dispatch`] walks a frame through
//! `FRAME_RECEIVED → LENGTH_CHECKED → TYPE_RESOLVED → DECODED → ACTIONED` and
//! reports where it stopped as a [`DispatchOutcome`]. No outcome is fatal: malformed
//! frames are counted and logged, and the next frame starts from a clean state.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::BridgeConfig;
use crate::consumer::Action;
use crate::registry::PacketRegistry;
use crate::sink::{CommandSink, ErrorSink};
use crate::types::{Frame, FrameSchema, PacketType};
use crate::{BridgeError, DecodeError, Result};

/// Counters scoped to one dispatch session.
///
/// `received` and `actioned` are the session counters proper; the rest break
/// anomalous frames down for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    /// Every frame handed to the dispatcher
    pub received: u64,
    /// Valid commands equal to the sentinel that reached the command sink
    pub actioned: u64,
    /// Commands handed to the command sink
    pub delivered: u64,
    /// ERROR packets handed to the error sink
    pub errors_reported: u64,
    pub length_mismatches: u64,
    pub unknown_types: u64,
    pub decode_errors: u64,
    /// Packets whose validity flag was false
    pub rejected: u64,
    /// Consumer actions that failed in their sink
    pub sink_failures: u64,
}

/// Where a frame's dispatch cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Frame length differed from the packet size; nothing was decoded
    LengthMismatch { expected: usize, actual: usize },
    /// Type id has no registry entry
    UnknownType { type_id: u8 },
    /// Decoder could not read the frame
    DecodeFailed { type_id: u8, error: DecodeError },
    /// Decoded packet was flagged invalid
    Rejected { packet_type: PacketType, type_id: u8 },
    /// Command handed to the command sink
    Delivered { command: String, sentinel: bool },
    /// ERROR packet handed to the error sink
    ErrorReported,
    /// Packet acknowledged by a reserved consumer
    Reserved { packet_type: PacketType },
    /// Consumer action failed
    SinkFailed { packet_type: PacketType, reason: String },
}

impl DispatchOutcome {
    /// Whether a consumer action completed.
    pub fn is_actioned(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Delivered { .. }
                | DispatchOutcome::ErrorReported
                | DispatchOutcome::Reserved { .. }
        )
    }

    /// The error behind a frame that was dropped or failed its action.
    ///
    /// None for completed actions and for unknown type ids, which are ignored
    /// rather than treated as faults.
    pub fn error(&self) -> Option<BridgeError> {
        match self {
            DispatchOutcome::LengthMismatch { expected, actual } => {
                Some(BridgeError::length_mismatch(*expected, *actual))
            }
            DispatchOutcome::DecodeFailed { type_id, error } => {
                Some(BridgeError::Decode { type_id: *type_id, source: error.clone() })
            }
            DispatchOutcome::Rejected { packet_type, type_id } => Some(BridgeError::invalid_packet(
                *type_id,
                format!("{} packet has its validity flag cleared", packet_type),
            )),
            DispatchOutcome::SinkFailed { reason, .. } => {
                Some(BridgeError::sink_failed(reason.clone(), None))
            }
            DispatchOutcome::UnknownType { .. }
            | DispatchOutcome::Delivered { .. }
            | DispatchOutcome::ErrorReported
            | DispatchOutcome::Reserved { .. } => None,
        }
    }
}

/// Routes raw frames to the registered decoder and consumer.
pub struct Dispatcher {
    registry: PacketRegistry,
    packet_size: usize,
    counters: SessionCounters,
}

impl Dispatcher {
    /// Create a dispatcher over a registry for frames of `packet_size` bytes.
    pub fn new(registry: PacketRegistry, packet_size: usize) -> Self {
        Self { registry, packet_size, counters: SessionCounters::default() }
    }

    /// Standard registry with the given sinks.
    pub fn with_sinks(
        config: &BridgeConfig,
        command_sink: Box<dyn CommandSink>,
        error_sink: Box<dyn ErrorSink>,
    ) -> Result<Self> {
        config.validate()?;
        let schema = config.protocol.schema()?;
        let registry = PacketRegistry::with_default_decoders(
            &schema,
            command_sink,
            error_sink,
            config.protocol.sentinel_command.clone(),
        )?;
        Ok(Self::new(registry, schema.frame_size))
    }

    /// Run one dispatch cycle over a raw buffer from the bus.
    pub fn dispatch(&mut self, raw: Vec<u8>) -> DispatchOutcome {
        self.counters.received += 1;
        trace!(received = self.counters.received, len = raw.len(), "Frame received");

        let actual = raw.len();
        let frame = match Frame::with_size(raw, self.packet_size) {
            Ok(frame) => frame,
            Err(_) => {
                self.counters.length_mismatches += 1;
                warn!(expected = self.packet_size, actual, "Dropping frame with wrong length");
                return DispatchOutcome::LengthMismatch { expected: self.packet_size, actual };
            }
        };

        let type_id = frame.type_id();
        let Some(entry) = self.registry.entry_mut(type_id) else {
            self.counters.unknown_types += 1;
            debug!(type_id, "Ignoring frame with unknown packet type");
            return DispatchOutcome::UnknownType { type_id };
        };

        let packet = match entry.decoder.decode(&frame) {
            Ok(packet) => packet,
            Err(error) => {
                self.counters.decode_errors += 1;
                warn!(type_id, %error, "Dropping frame that failed to decode");
                return DispatchOutcome::DecodeFailed { type_id, error };
            }
        };

        let packet_type = packet.packet_type();
        if !packet.is_valid() {
            self.counters.rejected += 1;
            debug!(%packet_type, type_id, "Rejected packet flagged invalid");
            return DispatchOutcome::Rejected { packet_type, type_id };
        }

        match entry.consumer.consume(&packet) {
            Ok(Action::Delivered { command, sentinel }) => {
                self.counters.delivered += 1;
                if sentinel {
                    self.counters.actioned += 1;
                }
                DispatchOutcome::Delivered { command, sentinel }
            }
            Ok(Action::ErrorReported) => {
                self.counters.errors_reported += 1;
                DispatchOutcome::ErrorReported
            }
            Ok(Action::Reserved) => DispatchOutcome::Reserved { packet_type },
            Err(error) => {
                self.counters.sink_failures += 1;
                warn!(%packet_type, %error, "Consumer action failed");
                DispatchOutcome::SinkFailed { packet_type, reason: error.to_string() }
            }
        }
    }

    /// Counters accumulated since the session started.
    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Zero the counters for a new session.
    pub fn reset(&mut self) {
        self.counters = SessionCounters::default();
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PacketRegistry {
        &mut self.registry
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registered", &self.registry.registered_ids())
            .field("packet_size", &self.packet_size)
            .field("counters", &self.counters)
            .finish()
    }
}

/// Dispatcher over the standard wire layout with the given sinks.
///
/// Convenience for embedding without a configuration file.
pub fn standard_dispatcher(
    command_sink: Box<dyn CommandSink>,
    error_sink: Box<dyn ErrorSink>,
) -> Result<Dispatcher> {
    let schema = FrameSchema::standard();
    let registry = PacketRegistry::with_default_decoders(
        &schema,
        command_sink,
        error_sink,
        crate::consumer::DEFAULT_SENTINEL_COMMAND,
    )?;
    Ok(Dispatcher::new(registry, schema.frame_size))
}
