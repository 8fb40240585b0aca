//! Core types for the bridge wire format.
//!
//! ## Architecture
//!
//! - [`Frame`] is a length-checked raw buffer received from the bus
//! - [`FrameSchema`] describes named fields with explicit offsets, checked against the frame size
//! - [`FieldType`] gives the element size of each field
//! - [`FieldData`] reads typed values out of a frame through a [`FieldInfo`]
//! - [`PacketType`] is the closed set of wire identifiers
//! - [`DecodedPacket`] is the typed interpretation of a frame
//!
//! ## Usage Example
//!
//! ```rust
//! use farmlink::types::{fields, FieldData, Frame, FrameSchema, PACKET_SIZE};
//!
//! let schema = FrameSchema::standard();
//! let mut data = vec![0u8; PACKET_SIZE];
//! data[0] = 1;
//! data[1] = 1;
//! data[2..5].copy_from_slice(b"G28");
//!
//! let frame = Frame::new(data).unwrap();
//! let info = schema.get_field(fields::COMMAND).unwrap();
//! let text = String::from_frame(frame.as_bytes(), info).unwrap();
//! assert!(text.starts_with("G28\0"));
//! ```

mod field_data;
mod field_type;
mod frame;
mod packet;
mod packet_type;
mod schema;

// Re-export all public types
pub use field_data::FieldData;
pub use field_type::FieldType;
pub use frame::{COMMAND_WINDOW, Frame, PACKET_SIZE, TYPE_ID_OFFSET, VALIDITY_OFFSET, type_id_of};
pub use packet::{CommandPacket, DecodedPacket, PacketHeader};
pub use packet_type::PacketType;
pub use schema::{FieldInfo, FrameSchema, fields};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BridgeError, DecodeError};

    use proptest::prelude::*;

    prop_compose! {
        fn arb_field_info()(
            name in "[a-z][a-z0-9_]*",
            field_type in prop::sample::select(vec![FieldType::UInt8, FieldType::Bool, FieldType::Text]),
            offset in 2..256usize,
            count in 1..64usize,
        ) -> FieldInfo {
            FieldInfo { name, field_type, offset, count, description: String::new() }
        }
    }

    proptest! {
        #[test]
        fn prop_schema_accepts_fields_inside_frame(
            fields in prop::collection::btree_map("f_[a-z0-9_]*", arb_field_info(), 0..12),
            frame_size in 64..512usize,
        ) {
            use std::collections::HashMap;
            let mut adjusted = HashMap::new();

            // Clamp every field between the header and the end of the frame
            for (name, mut info) in fields {
                let size = info.field_type.size() * info.count;
                let room = frame_size - 2;
                if size < room {
                    info.offset = 2 + info.offset % (room - size);
                } else {
                    info.offset = 2;
                    info.count = 1;
                }
                info.name = name.clone();
                adjusted.insert(name, info);
            }

            let schema = FrameSchema { fields: adjusted, frame_size };
            for info in schema.fields.values() {
                prop_assert!(info.range().end <= schema.frame_size);
            }
            prop_assert!(schema.validate().is_ok());
        }

        #[test]
        fn prop_frames_of_wrong_length_are_rejected(len in 0..1024usize) {
            prop_assume!(len != PACKET_SIZE);
            let result = Frame::new(vec![0u8; len]);
            let is_length_mismatch = matches!(
                result,
                Err(BridgeError::LengthMismatch { expected: PACKET_SIZE, actual }) if actual == len
            );
            prop_assert!(is_length_mismatch);
        }

        #[test]
        fn prop_type_id_and_validity_read_header_bytes(type_id in any::<u8>(), valid in any::<u8>()) {
            let mut data = vec![0u8; PACKET_SIZE];
            data[TYPE_ID_OFFSET] = type_id;
            data[VALIDITY_OFFSET] = valid;
            let frame = Frame::new(data).unwrap();

            prop_assert_eq!(type_id_of(&frame), type_id);
            prop_assert_eq!(frame.validity_byte(), valid);
        }

        #[test]
        fn prop_packet_type_ids_resolve_only_inside_known_set(id in any::<u8>()) {
            match PacketType::from_id(id) {
                Some(packet_type) => prop_assert_eq!(packet_type.id(), id),
                None => prop_assert!(id > 6),
            }
        }
    }

    #[test]
    fn standard_schema_matches_wire_layout() {
        let schema = FrameSchema::standard();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.frame_size, 128);
        assert_eq!(schema.field_count(), 3);

        let command = schema.get_field(fields::COMMAND).unwrap();
        assert_eq!(command.range(), 2..66);
        assert_eq!(schema.get_field(fields::PACKET_ID).unwrap().offset, 0);
        assert_eq!(schema.get_field(fields::VALID).unwrap().offset, 1);
    }

    #[test]
    fn schema_rejects_window_past_frame_end() {
        let result = FrameSchema::with_layout(64, 2..66);
        assert!(matches!(result, Err(BridgeError::Schema { .. })));
    }

    #[test]
    fn schema_rejects_window_over_header() {
        let result = FrameSchema::with_layout(128, 1..66);
        assert!(matches!(result, Err(BridgeError::Schema { .. })));
    }

    #[test]
    fn schema_rejects_empty_window() {
        assert!(FrameSchema::with_layout(128, 10..10).is_err());
    }

    #[test]
    fn field_data_checks_declared_type() {
        let schema = FrameSchema::standard();
        let frame = Frame::new(vec![0u8; PACKET_SIZE]).unwrap();
        let info = schema.get_field(fields::VALID).unwrap();

        let result = u8::from_frame(frame.as_bytes(), info);
        assert!(matches!(result, Err(DecodeError::TypeMismatch { expected: "UInt8", .. })));
        assert_eq!(bool::from_frame(frame.as_bytes(), info), Ok(false));
    }

    #[test]
    fn field_data_reports_out_of_bounds() {
        let info = FieldInfo::scalar("late", FieldType::UInt8, 200, "");
        let result = u8::from_frame(&[0u8; PACKET_SIZE], &info);
        assert!(matches!(result, Err(DecodeError::OutOfBounds { offset: 200, .. })));
    }

    #[test]
    fn text_field_rejects_invalid_utf8() {
        let schema = FrameSchema::standard();
        let info = schema.get_field(fields::COMMAND).unwrap();
        let mut data = vec![0u8; PACKET_SIZE];
        data[2] = b'G';
        data[3] = 0xFF;

        let result = String::from_frame(&data, info);
        assert_eq!(result, Err(DecodeError::InvalidEncoding { offset: 2, valid_up_to: 1 }));
    }

    #[test]
    fn packet_type_names_follow_wire_table() {
        let names: Vec<_> = PacketType::ALL.iter().map(|t| (t.id(), t.name())).collect();
        assert_eq!(
            names,
            vec![
                (0, "ERROR"),
                (1, "COMMAND"),
                (2, "SENSOR_A"),
                (3, "SENSOR_B"),
                (4, "DIGITAL_INPUT"),
                (5, "STATUS"),
                (6, "POSITION_REQUEST"),
            ]
        );
        assert_eq!(PacketType::Command.to_string(), "COMMAND(1)");
    }

    #[test]
    fn acknowledged_packets_keep_type_and_header() {
        let header = PacketHeader { type_id: 4, valid: true };
        for packet_type in PacketType::ALL {
            let packet = DecodedPacket::acknowledged(packet_type, header);
            assert_eq!(packet.packet_type(), packet_type);
            assert_eq!(packet.type_id(), 4);
            assert!(packet.is_valid());
        }
        assert_eq!(DecodedPacket::acknowledged(PacketType::Status, header).command(), None);
    }
}
