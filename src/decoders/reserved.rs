//! Decoder for packet types whose payload layout is not defined yet

use crate::types::{DecodedPacket, FieldData, FieldInfo, Frame, FrameSchema, PacketHeader, PacketType, fields};
use crate::{DecodeError, Result};

use super::PacketDecoder;
use super::command::required_field;

/// Acknowledges a packet type without extracting a payload.
///
/// Used for ERROR and the sensor, input, status and position types until their
/// payload layouts are specified. Swap in a real decoder through
/// [`PacketRegistry::register`](crate::PacketRegistry::register) once one exists.
#[derive(Debug, Clone)]
pub struct ReservedDecoder {
    packet_type: PacketType,
    packet_id: FieldInfo,
}

impl ReservedDecoder {
    pub fn from_schema(packet_type: PacketType, schema: &FrameSchema) -> Result<Self> {
        Ok(Self { packet_type, packet_id: required_field(schema, fields::PACKET_ID)? })
    }
}

impl PacketDecoder for ReservedDecoder {
    fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    fn decode(&self, frame: &Frame) -> Result<DecodedPacket, DecodeError> {
        let type_id = u8::from_frame(frame.as_bytes(), &self.packet_id)?;
        let header = PacketHeader { type_id, valid: type_id == self.packet_type.id() };
        Ok(DecodedPacket::acknowledged(self.packet_type, header))
    }
}
