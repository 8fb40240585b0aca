//! Per-type packet decoders.
//!
//! Decoding is split in two phases:
//! - **Construction**: a decoder resolves the fields it needs from a [`FrameSchema`]
//!   and fails early if the schema lacks them
//! - **Per frame**: [`PacketDecoder::decode`] reads those fields from a
//!   length-checked [`Frame`] with no lookups
//!
//! Validity is false whenever the frame's type id differs from the type the decoder
//! handles. Beyond that the command decoder takes the frame's validity byte, while the
//! reserved decoder always reports valid.
//!
//! # Example
//!
//! ```rust
//! use farmlink::decoders::{CommandDecoder, PacketDecoder};
//! use farmlink::types::{Frame, FrameSchema, PACKET_SIZE};
//!
//! let decoder = CommandDecoder::from_schema(&FrameSchema::standard()).unwrap();
//!
//! let mut data = vec![0u8; PACKET_SIZE];
//! data[0] = 1;
//! data[1] = 1;
//! data[2..9].copy_from_slice(b"  G28  ");
//!
//! let packet = decoder.decode(&Frame::new(data).unwrap()).unwrap();
//! assert!(packet.is_valid());
//! assert_eq!(packet.command(), Some("G28"));
//! ```
//!
//! [`FrameSchema`]: crate::types::FrameSchema
//! [`Frame`]: crate::types::Frame

mod command;
mod reserved;

pub use command::{CommandDecoder, clean_command};
pub use reserved::ReservedDecoder;

use crate::DecodeError;
use crate::types::{DecodedPacket, Frame, PacketType};

/// Turns a length-checked frame into a typed packet.
pub trait PacketDecoder: Send + Sync {
    /// Packet type this decoder handles.
    fn packet_type(&self) -> PacketType;

    /// Decode one frame. The frame length has already been checked by the caller.
    fn decode(&self, frame: &Frame) -> Result<DecodedPacket, DecodeError>;
}
