//! Packet registry mapping type ids to a decoder and a consumer action.
//!
//! Adding a packet type is a registry entry, not a new branch in the dispatcher:
//!
//! ```rust
//! use farmlink::{PacketRegistry, ReservedConsumer};
//! use farmlink::decoders::ReservedDecoder;
//! use farmlink::types::{FrameSchema, PacketType};
//!
//! let schema = FrameSchema::standard();
//! let mut registry = PacketRegistry::new();
//! registry.register(
//!     Box::new(ReservedDecoder::from_schema(PacketType::Status, &schema).unwrap()),
//!     Box::new(ReservedConsumer),
//! );
//!
//! assert!(registry.lookup_decoder(5).is_some());
//! assert!(registry.lookup_decoder(7).is_none());
//! ```

use std::collections::BTreeMap;

use crate::consumer::{CommandForwarder, ErrorReporter, PacketConsumer, ReservedConsumer};
use crate::decoders::{CommandDecoder, PacketDecoder, ReservedDecoder};
use crate::sink::{CommandSink, ErrorSink};
use crate::types::{FrameSchema, PacketType};
use crate::Result;

/// Decoder and consumer registered for one packet type.
pub struct RegistryEntry {
    pub decoder: Box<dyn PacketDecoder>,
    pub consumer: Box<dyn PacketConsumer>,
}

/// Table of known packet types.
#[derive(Default)]
pub struct PacketRegistry {
    entries: BTreeMap<u8, RegistryEntry>,
}

impl PacketRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry covering every known packet type.
    ///
    /// COMMAND is decoded and forwarded to `command_sink`, ERROR goes to
    /// `error_sink`, and the remaining types get reserved decoders and consumers.
    pub fn with_default_decoders(
        schema: &FrameSchema,
        command_sink: Box<dyn CommandSink>,
        error_sink: Box<dyn ErrorSink>,
        sentinel: impl Into<String>,
    ) -> Result<Self> {
        let mut registry = Self::new();

        registry.register(
            Box::new(ReservedDecoder::from_schema(PacketType::Error, schema)?),
            Box::new(ErrorReporter::new(error_sink)),
        );
        registry.register(
            Box::new(CommandDecoder::from_schema(schema)?),
            Box::new(CommandForwarder::new(command_sink, sentinel)),
        );

        for packet_type in PacketType::ALL {
            if !matches!(packet_type, PacketType::Error | PacketType::Command) {
                registry.register(
                    Box::new(ReservedDecoder::from_schema(packet_type, schema)?),
                    Box::new(ReservedConsumer),
                );
            }
        }

        Ok(registry)
    }

    /// Register a decoder and consumer under the decoder's packet type.
    ///
    /// Returns the entry previously registered for that type, if any.
    pub fn register(
        &mut self,
        decoder: Box<dyn PacketDecoder>,
        consumer: Box<dyn PacketConsumer>,
    ) -> Option<RegistryEntry> {
        let id = decoder.packet_type().id();
        self.entries.insert(id, RegistryEntry { decoder, consumer })
    }

    /// Replace only the consumer for a packet type already registered.
    pub fn set_consumer(
        &mut self,
        packet_type: PacketType,
        consumer: Box<dyn PacketConsumer>,
    ) -> Option<Box<dyn PacketConsumer>> {
        let entry = self.entries.get_mut(&packet_type.id())?;
        Some(std::mem::replace(&mut entry.consumer, consumer))
    }

    /// Decoder registered for a type id, `None` for unknown ids.
    pub fn lookup_decoder(&self, type_id: u8) -> Option<&dyn PacketDecoder> {
        self.entries.get(&type_id).map(|entry| entry.decoder.as_ref())
    }

    pub(crate) fn entry_mut(&mut self, type_id: u8) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(&type_id)
    }

    /// Registered type ids in ascending order.
    pub fn registered_ids(&self) -> Vec<u8> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
