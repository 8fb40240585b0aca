//! Error types for the bridge.
//!
//! All errors implement `std::error::Error` and carry enough context to tell which
//! frame, field or collaborator failed.
//!
//! ## Error Categories
//!
//! - **Frame Errors**: length mismatches and malformed payloads on inbound frames
//! - **Schema Errors**: frame schema fields that do not fit the frame
//! - **Collaborator Errors**: bus adapter and sink failures
//! - **Configuration Errors**: invalid or unreadable bridge configuration
//!
//! None of the frame errors end a session. The dispatcher records them and moves on
//! to the next frame; only bus failures can stop the session loop.
//!
//! ```rust
//! use farmlink::BridgeError;
//!
//! let error = BridgeError::bus_failed("BSC peripheral not responding");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Failure raised by a packet decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload window is not valid UTF-8.
    #[error("payload at offset {offset} is not valid UTF-8 (first bad byte at {valid_up_to})")]
    InvalidEncoding { offset: usize, valid_up_to: usize },

    /// Field is read as a different type than the schema declares.
    #[error("field '{field}' is {found}, expected {expected}")]
    TypeMismatch { field: String, expected: &'static str, found: &'static str },

    /// Field lies outside the frame handed to the decoder.
    #[error("field '{field}' at offset {offset} exceeds frame bounds")]
    OutOfBounds { field: String, offset: usize },
}

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Decode failed for packet type {type_id}: {source}")]
    Decode {
        type_id: u8,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid packet of type {type_id}: {reason}")]
    InvalidPacket { type_id: u8, reason: String },

    #[error("Schema validation failed: {reason}")]
    Schema { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Bus adapter error: {reason}")]
    Bus {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Command sink error: {reason}")]
    Sink {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode frame: {reason}")]
    Encode { reason: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Bus { .. } => true,
            BridgeError::Sink { .. } => true,
            BridgeError::Timeout { .. } => true,
            BridgeError::LengthMismatch { .. } => false,
            BridgeError::Decode { .. } => false,
            BridgeError::InvalidPacket { .. } => false,
            BridgeError::Schema { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::File { .. } => false,
            BridgeError::Encode { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::LengthMismatch { .. } => vec![
                "Check the controller sends whole packets in one transfer",
                "Verify both sides agree on the packet size",
            ],
            BridgeError::Decode { .. } => vec![
                "Check the controller pads the text window with NUL bytes",
                "Verify the payload window boundaries on both sides",
            ],
            BridgeError::InvalidPacket { .. } => vec![
                "Check the validity flag set by the controller",
                "Verify the packet type id matches the payload layout",
            ],
            BridgeError::Schema { .. } => vec![
                "Check field offsets and lengths fit within the frame",
                "Keep payload fields clear of the header bytes",
            ],
            BridgeError::Config { .. } => vec![
                "Check the configuration file against the documented defaults",
                "Remove unknown or mistyped keys",
            ],
            BridgeError::Bus { .. } => vec![
                "Ensure the bus daemon is running",
                "Check wiring and pull-up resistors on SDA and SCL",
                "Verify the configured slave address matches the controller",
            ],
            BridgeError::Sink { .. } => vec![
                "Ensure the command stream consumer is running",
                "Check permissions on the command stream path",
            ],
            BridgeError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            BridgeError::Encode { .. } => vec![
                "Provide a non-empty command",
                "Keep commands shorter than the payload window",
            ],
            BridgeError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Verify the controller is powered and transmitting",
            ],
        }
    }

    /// Helper constructor for length mismatches.
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        BridgeError::LengthMismatch { expected, actual }
    }

    /// Helper constructor for invalid packets.
    pub fn invalid_packet(type_id: u8, reason: impl Into<String>) -> Self {
        BridgeError::InvalidPacket { type_id, reason: reason.into() }
    }

    /// Helper constructor for schema errors.
    pub fn schema(reason: impl Into<String>) -> Self {
        BridgeError::Schema { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        BridgeError::Config { reason: reason.into() }
    }

    /// Helper constructor for bus errors.
    pub fn bus_failed(reason: impl Into<String>) -> Self {
        BridgeError::Bus { reason: reason.into(), source: None }
    }

    /// Helper constructor for bus errors with source.
    pub fn bus_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Bus { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for sink errors with source.
    pub fn sink_failed(
        reason: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BridgeError::Sink { reason: reason.into(), source }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        BridgeError::File { path, source }
    }

    /// Helper constructor for encoder errors.
    pub fn encode(reason: impl Into<String>) -> Self {
        BridgeError::Encode { reason: reason.into() }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
