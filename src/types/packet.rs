//! Decoded packet types

use serde::{Deserialize, Serialize};

use super::PacketType;

/// Fields every decoded packet carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    /// Type id exactly as read from the frame
    pub type_id: u8,
    /// Decoder-reported validity
    pub valid: bool,
}

/// A decoded COMMAND packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPacket {
    pub header: PacketHeader,
    /// Command text with padding and surrounding whitespace stripped
    pub command: String,
}

/// Typed interpretation of a frame, one variant per known packet type.
///
/// Only COMMAND carries an extracted payload; the other variants acknowledge the
/// packet until their payload layouts are defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedPacket {
    Error(PacketHeader),
    Command(CommandPacket),
    SensorA(PacketHeader),
    SensorB(PacketHeader),
    DigitalInput(PacketHeader),
    Status(PacketHeader),
    PositionRequest(PacketHeader),
}

impl DecodedPacket {
    /// Packet with no extracted payload for the given type.
    pub fn acknowledged(packet_type: PacketType, header: PacketHeader) -> Self {
        match packet_type {
            PacketType::Error => DecodedPacket::Error(header),
            PacketType::Command => {
                DecodedPacket::Command(CommandPacket { header, command: String::new() })
            }
            PacketType::SensorA => DecodedPacket::SensorA(header),
            PacketType::SensorB => DecodedPacket::SensorB(header),
            PacketType::DigitalInput => DecodedPacket::DigitalInput(header),
            PacketType::Status => DecodedPacket::Status(header),
            PacketType::PositionRequest => DecodedPacket::PositionRequest(header),
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            DecodedPacket::Error(_) => PacketType::Error,
            DecodedPacket::Command(_) => PacketType::Command,
            DecodedPacket::SensorA(_) => PacketType::SensorA,
            DecodedPacket::SensorB(_) => PacketType::SensorB,
            DecodedPacket::DigitalInput(_) => PacketType::DigitalInput,
            DecodedPacket::Status(_) => PacketType::Status,
            DecodedPacket::PositionRequest(_) => PacketType::PositionRequest,
        }
    }

    pub fn header(&self) -> &PacketHeader {
        match self {
            DecodedPacket::Command(packet) => &packet.header,
            DecodedPacket::Error(header)
            | DecodedPacket::SensorA(header)
            | DecodedPacket::SensorB(header)
            | DecodedPacket::DigitalInput(header)
            | DecodedPacket::Status(header)
            | DecodedPacket::PositionRequest(header) => header,
        }
    }

    pub fn type_id(&self) -> u8 {
        self.header().type_id
    }

    pub fn is_valid(&self) -> bool {
        self.header().valid
    }

    /// Command text for COMMAND packets.
    pub fn command(&self) -> Option<&str> {
        match self {
            DecodedPacket::Command(packet) => Some(&packet.command),
            _ => None,
        }
    }
}
