//! Frame field type definitions

use serde::{Deserialize, Serialize};

/// Supported frame field types.
///
/// Multi-element fields (text windows) are expressed as a base type with a count,
/// so the byte length of a field is always `size() * count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// 8-bit unsigned integer
    UInt8,
    /// Boolean flag, any non-zero byte is true
    Bool,
    /// One byte of UTF-8 text
    Text,
}

impl FieldType {
    /// Returns the size in bytes of one element of this type.
    pub const fn size(&self) -> usize {
        match self {
            FieldType::UInt8 | FieldType::Bool | FieldType::Text => 1,
        }
    }

    /// Short name used in diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            FieldType::UInt8 => "UInt8",
            FieldType::Bool => "Bool",
            FieldType::Text => "Text",
        }
    }
}
