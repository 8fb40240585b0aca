//! Known packet type identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Packet type carried in byte 0 of every frame.
///
/// The set is closed on the wire but extensible in the registry: ids outside this
/// enum are the unknown-type case and are ignored rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PacketType {
    /// Controller error report
    Error = 0,
    /// Machine-control command text (G-code)
    Command = 1,
    /// Air sensor reading (AHT20 temperature and humidity)
    SensorA = 2,
    /// Water sensor reading (pH and dissolved solids)
    SensorB = 3,
    /// Digital inputs (e-stop and start buttons)
    DigitalInput = 4,
    /// Net pot status
    Status = 5,
    /// Request for the current axis positions
    PositionRequest = 6,
}

impl PacketType {
    /// Every known packet type in id order.
    pub const ALL: [PacketType; 7] = [
        PacketType::Error,
        PacketType::Command,
        PacketType::SensorA,
        PacketType::SensorB,
        PacketType::DigitalInput,
        PacketType::Status,
        PacketType::PositionRequest,
    ];

    /// Wire identifier.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Resolve a wire identifier; `None` for unknown ids.
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(PacketType::Error),
            1 => Some(PacketType::Command),
            2 => Some(PacketType::SensorA),
            3 => Some(PacketType::SensorB),
            4 => Some(PacketType::DigitalInput),
            5 => Some(PacketType::Status),
            6 => Some(PacketType::PositionRequest),
            _ => None,
        }
    }

    /// Protocol name as used in logs and configuration.
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Error => "ERROR",
            PacketType::Command => "COMMAND",
            PacketType::SensorA => "SENSOR_A",
            PacketType::SensorB => "SENSOR_B",
            PacketType::DigitalInput => "DIGITAL_INPUT",
            PacketType::Status => "STATUS",
            PacketType::PositionRequest => "POSITION_REQUEST",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}
