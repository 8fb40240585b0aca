//! COMMAND packet decoder

use crate::types::{
    CommandPacket, DecodedPacket, FieldData, FieldInfo, Frame, FrameSchema, PacketHeader,
    PacketType, fields,
};
use crate::{BridgeError, DecodeError, Result};

use super::PacketDecoder;

/// Decodes the command text carried by COMMAND packets.
///
/// Field layout is resolved from the schema once, at construction.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    packet_id: FieldInfo,
    valid: FieldInfo,
    command: FieldInfo,
}

impl CommandDecoder {
    /// Resolve the fields this decoder needs from a frame schema.
    pub fn from_schema(schema: &FrameSchema) -> Result<Self> {
        Ok(Self {
            packet_id: required_field(schema, fields::PACKET_ID)?,
            valid: required_field(schema, fields::VALID)?,
            command: required_field(schema, fields::COMMAND)?,
        })
    }

    /// Byte window the command text is read from.
    pub fn window(&self) -> std::ops::Range<usize> {
        self.command.range()
    }
}

impl PacketDecoder for CommandDecoder {
    fn packet_type(&self) -> PacketType {
        PacketType::Command
    }

    fn decode(&self, frame: &Frame) -> Result<DecodedPacket, DecodeError> {
        let data = frame.as_bytes();
        let type_id = u8::from_frame(data, &self.packet_id)?;

        // A frame routed here under another id is never valid.
        let valid = type_id == PacketType::Command.id() && bool::from_frame(data, &self.valid)?;

        let text = String::from_frame(data, &self.command)?;
        let command = clean_command(&text).to_string();

        Ok(DecodedPacket::Command(CommandPacket { header: PacketHeader { type_id, valid }, command }))
    }
}

pub(super) fn required_field(schema: &FrameSchema, name: &str) -> Result<FieldInfo> {
    schema.get_field(name).cloned().ok_or_else(|| {
        BridgeError::schema(format!("Missing required field '{}'", name))
    })
}

/// Cut the text at its NUL terminator and strip surrounding whitespace.
pub fn clean_command(text: &str) -> &str {
    let terminated = match text.find('\0') {
        Some(end) => &text[..end],
        None => text,
    };
    terminated.trim()
}
