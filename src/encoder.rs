//! Frame encoding, the controller side of the wire format.
//!
//! The host never transmits these frames itself; they are produced for replay
//! captures, for injecting frames through a [`ChannelBus`](crate::bus::ChannelBus),
//! and for tests.

use crate::types::{COMMAND_WINDOW, Frame, PACKET_SIZE, PacketType, TYPE_ID_OFFSET, VALIDITY_OFFSET};
use crate::{BridgeError, Result};

/// Builder for arbitrary frames.
///
/// ```rust
/// use farmlink::encoder::FrameBuilder;
/// use farmlink::types::PacketType;
///
/// let frame = FrameBuilder::new(PacketType::Status.id()).valid(true).build().unwrap();
/// assert_eq!(frame.type_id(), 5);
/// assert_eq!(frame.validity_byte(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    data: Vec<u8>,
    cursor: usize,
}

impl FrameBuilder {
    /// Zeroed frame of [`PACKET_SIZE`] bytes with the given type id.
    pub fn new(type_id: u8) -> Self {
        Self::with_size(type_id, PACKET_SIZE)
    }

    /// Zeroed frame of `size` bytes with the given type id.
    pub fn with_size(type_id: u8, size: usize) -> Self {
        let mut data = vec![0u8; size];
        if let Some(byte) = data.get_mut(TYPE_ID_OFFSET) {
            *byte = type_id;
        }
        Self { data, cursor: COMMAND_WINDOW.start }
    }

    /// Set the validity byte.
    pub fn valid(self, valid: bool) -> Self {
        self.validity_byte(valid as u8)
    }

    /// Set the raw validity byte.
    pub fn validity_byte(mut self, value: u8) -> Self {
        if let Some(byte) = self.data.get_mut(VALIDITY_OFFSET) {
            *byte = value;
        }
        self
    }

    /// Copy bytes into the frame starting at the payload window, truncating at the
    /// frame end.
    pub fn payload(mut self, bytes: &[u8]) -> Self {
        let end = (self.cursor + bytes.len()).min(self.data.len());
        if self.cursor < end {
            let len = end - self.cursor;
            self.data[self.cursor..end].copy_from_slice(&bytes[..len]);
            self.cursor = end;
        }
        self
    }

    /// Raw bytes without length checking.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Length-checked frame.
    pub fn build(self) -> Result<Frame> {
        Frame::new(self.data)
    }
}

/// Pack a COMMAND frame the way the controller does.
///
/// Empty commands are refused. Text longer than the window is truncated so the last
/// window byte is always a NUL terminator.
pub fn encode_command(command: &str) -> Result<Frame> {
    if command.is_empty() {
        return Err(BridgeError::encode("command is empty"));
    }

    let capacity = COMMAND_WINDOW.len() - 1;
    let mut end = command.len().min(capacity);
    // Never split a UTF-8 sequence; the host rejects invalid text.
    while !command.is_char_boundary(end) {
        end -= 1;
    }

    FrameBuilder::new(PacketType::Command.id())
        .valid(true)
        .payload(&command.as_bytes()[..end])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::{CommandDecoder, PacketDecoder};
    use crate::types::FrameSchema;

    fn decode(frame: &Frame) -> String {
        let decoder = CommandDecoder::from_schema(&FrameSchema::standard()).unwrap();
        decoder.decode(frame).unwrap().command().unwrap().to_string()
    }

    #[test]
    fn encoded_command_uses_wire_layout() {
        let frame = encode_command("G28").unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(bytes.len(), PACKET_SIZE);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[2..5], b"G28");
        assert!(bytes[5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_command_is_refused() {
        assert!(matches!(encode_command(""), Err(BridgeError::Encode { .. })));
    }

    #[test]
    fn long_command_keeps_terminator() {
        let long = "G1 ".repeat(40);
        let frame = encode_command(&long).unwrap();

        assert_eq!(frame.as_bytes()[COMMAND_WINDOW.end - 1], 0);
        assert_eq!(decode(&frame), long[..63].trim());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = format!("{}é", "X".repeat(62));
        let frame = encode_command(&text).unwrap();
        assert_eq!(decode(&frame), "X".repeat(62));
    }

    #[test]
    fn builder_payload_stops_at_frame_end() {
        let bytes = FrameBuilder::with_size(1, 8).payload(b"abcdefghij").into_bytes();
        assert_eq!(bytes, b"\x01\x00abcdef");
    }

    #[test]
    fn builder_rejects_wrong_size_on_build() {
        let result = FrameBuilder::with_size(1, 100).build();
        assert!(matches!(result, Err(BridgeError::LengthMismatch { expected: 128, actual: 100 })));
    }
}
