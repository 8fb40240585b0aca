//! Field data parsing trait and implementations

use super::{FieldInfo, FieldType};
use crate::DecodeError;

/// Trait for types that can be read from a frame field.
pub trait FieldData: Sized {
    /// Parse this type from frame bytes at the field's offset.
    fn from_frame(data: &[u8], info: &FieldInfo) -> Result<Self, DecodeError>;
}

fn expect_type(info: &FieldInfo, expected: FieldType) -> Result<(), DecodeError> {
    if info.field_type != expected {
        return Err(DecodeError::TypeMismatch {
            field: info.name.clone(),
            expected: expected.name(),
            found: info.field_type.name(),
        });
    }
    Ok(())
}

fn field_bytes<'a>(data: &'a [u8], info: &FieldInfo) -> Result<&'a [u8], DecodeError> {
    data.get(info.range())
        .ok_or_else(|| DecodeError::OutOfBounds { field: info.name.clone(), offset: info.offset })
}

impl FieldData for u8 {
    fn from_frame(data: &[u8], info: &FieldInfo) -> Result<Self, DecodeError> {
        expect_type(info, FieldType::UInt8)?;
        Ok(field_bytes(data, info)?[0])
    }
}

impl FieldData for bool {
    fn from_frame(data: &[u8], info: &FieldInfo) -> Result<Self, DecodeError> {
        expect_type(info, FieldType::Bool)?;
        Ok(field_bytes(data, info)?[0] != 0)
    }
}

/// Text windows decode the whole window; padding is left for the caller to strip.
impl FieldData for String {
    fn from_frame(data: &[u8], info: &FieldInfo) -> Result<Self, DecodeError> {
        expect_type(info, FieldType::Text)?;
        let bytes = field_bytes(data, info)?;

        std::str::from_utf8(bytes).map(str::to_owned).map_err(|e| {
            DecodeError::InvalidEncoding { offset: info.offset, valid_up_to: e.valid_up_to() }
        })
    }
}
