//! Launchkey display SysEx decoding
//!
//! Frame layout: `F0 00 20 29 02 13 <payload...> F7`

use thiserror::Error;

use crate::midi::is_sysex_frame;

/// Novation manufacturer id (offsets 1-3)
pub const MANUFACTURER_ID: [u8; 3] = [0x00, 0x20, 0x29];
/// Launchkey Mini MK4 sub-header (offsets 4-5)
pub const PRODUCT_ID: [u8; 2] = [0x02, 0x13];
/// F0 + manufacturer + product
pub const HEADER_LEN: usize = 6;

/// `06 <target> <field> <ascii...>`
pub const CMD_SET_FIELD: u8 = 0x06;
/// `04 <target> 7F`
pub const CMD_TRIGGER: u8 = 0x04;
pub const TRIGGER_MARKER: u8 = 0x7F;

const MIN_FRAME_LEN: usize = 8;

/// Display command carried by one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    SetField { target: u8, field: u8, text: String },
    Trigger { target: u8 },
}

/// Why a frame was not decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SysexError {
    /// Not a complete frame, or shorter than the smallest display command
    #[error("frame too short or unterminated ({0} bytes)")]
    TooShort(usize),

    /// SysEx for another manufacturer
    #[error("foreign manufacturer id")]
    ForeignManufacturer,

    /// Novation SysEx for another product
    #[error("foreign product id")]
    ForeignProduct,

    /// Set-field or trigger with a bad length or marker
    #[error("malformed command 0x{0:02X}")]
    Malformed(u8),

    #[error("unknown display command 0x{0:02X}")]
    UnknownCommand(u8),
}

impl SysexError {
    /// Foreign or truncated frames are routine bus traffic and are not worth a warning
    pub fn is_foreign(&self) -> bool {
        matches!(
            self,
            SysexError::TooShort(_) | SysexError::ForeignManufacturer | SysexError::ForeignProduct
        )
    }
}

/// Decode one complete SysEx frame
pub fn decode(frame: &[u8]) -> Result<DisplayCommand, SysexError> {
    if frame.len() < MIN_FRAME_LEN || !is_sysex_frame(frame) {
        return Err(SysexError::TooShort(frame.len()));
    }
    if frame[1..4] != MANUFACTURER_ID {
        return Err(SysexError::ForeignManufacturer);
    }
    if frame[4..6] != PRODUCT_ID {
        return Err(SysexError::ForeignProduct);
    }

    let payload = &frame[HEADER_LEN..frame.len() - 1];
    let command = payload[0];

    match command {
        CMD_SET_FIELD => match payload {
            [_, target, field, text @ ..] if !text.is_empty() => Ok(DisplayCommand::SetField {
                target: *target,
                field: *field,
                text: text.iter().map(|&b| b as char).collect(),
            }),
            _ => Err(SysexError::Malformed(command)),
        },
        CMD_TRIGGER => match payload {
            [_, target, TRIGGER_MARKER, ..] => Ok(DisplayCommand::Trigger { target: *target }),
            _ => Err(SysexError::Malformed(command)),
        },
        other => Err(SysexError::UnknownCommand(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_field() {
        let frame = [
            0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x06, 0x20, 0x00, 0x48, 0x65, 0x6C, 0x6C, 0x6F,
            0xF7,
        ];
        assert_eq!(
            decode(&frame),
            Ok(DisplayCommand::SetField {
                target: 0x20,
                field: 0,
                text: "Hello".to_string(),
            })
        );
    }

    #[test]
    fn test_trigger() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x04, 0x21, 0x7F, 0xF7];
        assert_eq!(decode(&frame), Ok(DisplayCommand::Trigger { target: 0x21 }));
    }

    #[test]
    fn test_trigger_without_marker() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x04, 0x20, 0x00, 0xF7];
        assert_eq!(decode(&frame), Err(SysexError::Malformed(CMD_TRIGGER)));
    }

    #[test]
    fn test_set_field_without_text() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x06, 0x20, 0x01, 0xF7];
        assert_eq!(decode(&frame), Err(SysexError::Malformed(CMD_SET_FIELD)));
    }

    #[test]
    fn test_short_frame_rejected() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0xF7];
        let err = decode(&frame).unwrap_err();
        assert_eq!(err, SysexError::TooShort(7));
        assert!(err.is_foreign());
    }

    #[test]
    fn test_minimum_length_frame_is_decoded_not_dropped() {
        let set_field = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x06, 0xF7];
        let err = decode(&set_field).unwrap_err();
        assert_eq!(err, SysexError::Malformed(CMD_SET_FIELD));
        assert!(!err.is_foreign());

        let trigger = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x04, 0xF7];
        assert_eq!(decode(&trigger), Err(SysexError::Malformed(CMD_TRIGGER)));
    }

    #[test]
    fn test_foreign_headers_rejected() {
        let other_vendor = [0xF0, 0x00, 0x20, 0x32, 0x02, 0x13, 0x04, 0x20, 0x7F, 0xF7];
        assert_eq!(decode(&other_vendor), Err(SysexError::ForeignManufacturer));

        let other_product = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0F, 0x04, 0x20, 0x7F, 0xF7];
        assert_eq!(decode(&other_product), Err(SysexError::ForeignProduct));
    }

    #[test]
    fn test_unknown_command_is_not_foreign() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x0E, 0x01, 0x02, 0xF7];
        let err = decode(&frame).unwrap_err();
        assert_eq!(err, SysexError::UnknownCommand(0x0E));
        assert!(!err.is_foreign());
    }

    #[test]
    fn test_text_bytes_map_to_chars() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0x02, 0x13, 0x06, 0x21, 0x02, 0x41, 0x20, 0x7E, 0xF7];
        match decode(&frame) {
            Ok(DisplayCommand::SetField { text, field, .. }) => {
                assert_eq!(field, 2);
                assert_eq!(text, "A ~");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
