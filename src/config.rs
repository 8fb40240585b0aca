//! Bridge configuration.
//!
//! Loaded from YAML; every key is optional and falls back to the values the
//! controller firmware uses.
//!
//! ```yaml
//! bus:
//!   address: 9
//!   sda_pin: 18
//!   scl_pin: 19
//! protocol:
//!   packet_size: 128
//!   command_window: { start: 2, end: 66 }
//!   sentinel_command: G28
//! sink:
//!   command_path: /tmp/printer
//! session:
//!   max_bus_errors: 10
//!   error_backoff_ms: 50
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::bus::pacing_period;
use crate::consumer::DEFAULT_SENTINEL_COMMAND;
use crate::sink::DEFAULT_COMMAND_PATH;
use crate::types::{COMMAND_WINDOW, FrameSchema, PACKET_SIZE, VALIDITY_OFFSET};
use crate::{BridgeError, Result};

/// Default 7-bit slave address of the host on the bus.
pub const DEFAULT_BUS_ADDRESS: u8 = 0x09;

/// Top-level bridge configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub bus: BusConfig,
    pub protocol: ProtocolConfig,
    pub sink: SinkConfig,
    pub session: SessionConfig,
}

impl BridgeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| BridgeError::config(format!("YAML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!(path = %path.display(), "Loaded bridge configuration");
        Ok(config)
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| BridgeError::config(format!("YAML serialize error: {}", e)))
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.bus.address > 0x7F {
            return Err(BridgeError::config(format!(
                "Bus address {:#04x} is not a 7-bit address",
                self.bus.address
            )));
        }

        self.protocol.schema()?;

        let sentinel = &self.protocol.sentinel_command;
        if sentinel.trim().is_empty() {
            return Err(BridgeError::config("Sentinel command is empty"));
        }
        if sentinel.trim() != sentinel {
            // Decoded commands are always stripped, so a padded sentinel never matches.
            return Err(BridgeError::config(format!(
                "Sentinel command {:?} has surrounding whitespace",
                sentinel
            )));
        }

        if self.session.max_bus_errors == 0 {
            return Err(BridgeError::config("max_bus_errors must be at least 1"));
        }

        if let Some(rate) = self.session.replay_rate_hz {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(BridgeError::config(format!("Replay rate {} Hz is not positive", rate)));
            }
            if pacing_period(rate).is_none() {
                return Err(BridgeError::config(format!("Replay rate {} Hz has no usable period", rate)));
            }
        }

        Ok(())
    }
}

/// Bus parameters handed to the external bus adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// 7-bit slave address the host answers on
    pub address: u8,
    /// GPIO carrying SDA
    pub sda_pin: u8,
    /// GPIO carrying SCL
    pub scl_pin: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { address: DEFAULT_BUS_ADDRESS, sda_pin: 18, scl_pin: 19 }
    }
}

/// Wire format parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Fixed frame length in bytes
    pub packet_size: usize,
    /// Byte window of the command text
    pub command_window: WindowConfig,
    /// Command whose delivery counts as an actioned packet
    pub sentinel_command: String,
}

impl ProtocolConfig {
    /// Frame schema for this layout.
    pub fn schema(&self) -> Result<FrameSchema> {
        if self.packet_size <= VALIDITY_OFFSET {
            return Err(BridgeError::config(format!(
                "Packet size {} leaves no room for the header",
                self.packet_size
            )));
        }

        FrameSchema::with_layout(self.packet_size, self.command_window.start..self.command_window.end)
            .map_err(|e| BridgeError::config(e.to_string()))
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            packet_size: PACKET_SIZE,
            command_window: WindowConfig::default(),
            sentinel_command: DEFAULT_SENTINEL_COMMAND.to_string(),
        }
    }
}

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    pub start: usize,
    pub end: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { start: COMMAND_WINDOW.start, end: COMMAND_WINDOW.end }
    }
}

/// Command sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    /// File or pipe commands are appended to
    pub command_path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { command_path: PathBuf::from(DEFAULT_COMMAND_PATH) }
    }
}

/// Session loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Consecutive bus errors tolerated before the session ends
    pub max_bus_errors: u32,
    /// Base delay of the exponential backoff after a bus error
    pub error_backoff_ms: u64,
    /// Pacing for replayed captures; unpaced when absent
    pub replay_rate_hz: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_bus_errors: 10, error_backoff_ms: 50, replay_rate_hz: None }
    }
}
