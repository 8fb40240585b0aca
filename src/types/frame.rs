//! Raw frame type and wire layout constants

use std::ops::Range;
use std::sync::Arc;

use crate::{BridgeError, Result};

/// Fixed length of every frame on the bus.
pub const PACKET_SIZE: usize = 128;

/// Offset of the packet type identifier.
pub const TYPE_ID_OFFSET: usize = 0;

/// Offset of the sender validity flag.
pub const VALIDITY_OFFSET: usize = 1;

/// Byte window carrying command text in COMMAND packets.
pub const COMMAND_WINDOW: Range<usize> = 2..66;

/// A length-checked frame received from the bus.
///
/// Frames can only be built from buffers of exactly the expected size, so every
/// accessor below is in bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame bytes (shared via Arc)
    data: Arc<[u8]>,
}

impl Frame {
    /// Wrap a buffer of exactly [`PACKET_SIZE`] bytes.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        Self::with_size(data, PACKET_SIZE)
    }

    /// Wrap a buffer of exactly `size` bytes.
    pub fn with_size(data: Vec<u8>, size: usize) -> Result<Self> {
        // The header bytes must exist for type_id()/validity_byte().
        if data.len() != size || size <= VALIDITY_OFFSET {
            return Err(BridgeError::length_mismatch(size, data.len()));
        }
        Ok(Self { data: data.into() })
    }

    /// Packet type identifier (byte 0).
    pub fn type_id(&self) -> u8 {
        self.data[TYPE_ID_OFFSET]
    }

    /// Raw validity byte (byte 1).
    pub fn validity_byte(&self) -> u8 {
        self.data[VALIDITY_OFFSET]
    }

    /// Full frame contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Read the packet type identifier of a frame.
pub fn type_id_of(frame: &Frame) -> u8 {
    frame.type_id()
}
