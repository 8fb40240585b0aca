//! Declarative frame schema types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

use super::FieldType;
use super::frame::{COMMAND_WINDOW, PACKET_SIZE, TYPE_ID_OFFSET, VALIDITY_OFFSET};

/// Well-known field names of the standard frame layout.
pub mod fields {
    /// Packet type identifier, byte 0 of every frame.
    pub const PACKET_ID: &str = "packet_id";
    /// Sender-side validity flag, byte 1 of every frame.
    pub const VALID: &str = "valid";
    /// Command text window of COMMAND packets.
    pub const COMMAND: &str = "command";
}

/// Schema describing the named fields of a frame and the frame size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSchema {
    /// Map of field names to their layout (provides O(1) lookup)
    pub fields: HashMap<String, FieldInfo>,
    /// Total size of a frame in bytes
    pub frame_size: usize,
}

impl FrameSchema {
    /// Create a new FrameSchema with validation.
    pub fn new(fields: HashMap<String, FieldInfo>, frame_size: usize) -> crate::Result<Self> {
        let schema = Self { fields, frame_size };
        schema.validate()?;
        Ok(schema)
    }

    /// The wire layout shared with the controller: 128-byte frames, id and validity
    /// header, command text in bytes [2, 66).
    pub fn standard() -> Self {
        Self { fields: layout_fields(COMMAND_WINDOW), frame_size: PACKET_SIZE }
    }

    /// Build the standard header fields with a custom frame size and command window.
    pub fn with_layout(frame_size: usize, command_window: Range<usize>) -> crate::Result<Self> {
        if command_window.start >= command_window.end {
            return Err(crate::BridgeError::schema(format!(
                "Command window {}..{} is empty",
                command_window.start, command_window.end
            )));
        }

        Self::new(layout_fields(command_window), frame_size)
    }

    /// Validate the schema for consistency.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, field) in &self.fields {
            if field.count == 0 {
                return Err(crate::BridgeError::schema(format!(
                    "Field '{}' has count of 0",
                    name
                )));
            }

            if field.name != *name {
                return Err(crate::BridgeError::schema(format!(
                    "Field map key '{}' doesn't match info name '{}'",
                    name, field.name
                )));
            }

            if field.range().end > self.frame_size {
                return Err(crate::BridgeError::schema(format!(
                    "Field '{}' ends at byte {} past the {}-byte frame",
                    name,
                    field.range().end,
                    self.frame_size
                )));
            }
        }

        // Payload fields must not overlap the header bytes every decoder relies on.
        let header = [fields::PACKET_ID, fields::VALID];
        for field in self.fields.values().filter(|f| !header.contains(&f.name.as_str())) {
            for header_name in header {
                if let Some(header_field) = self.fields.get(header_name) {
                    if overlaps(&field.range(), &header_field.range()) {
                        return Err(crate::BridgeError::schema(format!(
                            "Field '{}' overlaps header field '{}'",
                            field.name, header_name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Get field info by name (O(1) lookup).
    pub fn get_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Get the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl Default for FrameSchema {
    fn default() -> Self {
        Self::standard()
    }
}

fn layout_fields(command_window: Range<usize>) -> HashMap<String, FieldInfo> {
    [
        FieldInfo::scalar(fields::PACKET_ID, FieldType::UInt8, TYPE_ID_OFFSET, "Packet type id"),
        FieldInfo::scalar(fields::VALID, FieldType::Bool, VALIDITY_OFFSET, "Sender validity flag"),
        FieldInfo {
            name: fields::COMMAND.to_string(),
            field_type: FieldType::Text,
            offset: command_window.start,
            count: command_window.end - command_window.start,
            description: "NUL-padded command text".to_string(),
        },
    ]
    .into_iter()
    .map(|info| (info.name.clone(), info))
    .collect()
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Layout of one named field inside a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Element type of the field
    pub field_type: FieldType,
    /// Byte offset within the frame
    pub offset: usize,
    /// Number of elements (1 for scalar, >1 for text windows)
    pub count: usize,
    /// Human-readable description
    pub description: String,
}

impl FieldInfo {
    /// Single-element field.
    pub fn scalar(name: &str, field_type: FieldType, offset: usize, description: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            offset,
            count: 1,
            description: description.to_string(),
        }
    }

    /// Byte range the field occupies.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.field_type.size() * self.count
    }
}
