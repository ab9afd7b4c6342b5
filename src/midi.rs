//! MIDI utilities and message types
//!
//! Channel-voice parsing/encoding, SysEx framing and 14-bit helpers used by
//! the bridge and the command router.

use std::fmt;

/// Status nibble for Note Off
pub const NOTE_OFF: u8 = 0x80;
/// Status nibble for Note On
pub const NOTE_ON: u8 = 0x90;
/// Status nibble for Control Change
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Status nibble for Pitch Bend
pub const PITCH_BEND: u8 = 0xE0;

/// Start of a System Exclusive frame
pub const SYSEX_START: u8 = 0xF0;
/// End of a System Exclusive frame
pub const SYSEX_END: u8 = 0xF7;

/// Highest 14-bit pitch bend value
pub const PITCH_BEND_MAX: u16 = 0x3FFF;
/// Resting position of a pitch wheel
pub const PITCH_BEND_CENTER: u16 = 8192;

/// MIDI message types handled by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive: bytes between 0xF0 and 0xF7 (exclusive)
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes.
    ///
    /// Note On keeps its status even with velocity 0: the bridge relays bytes
    /// verbatim and clients decide how to read a zero-velocity note.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;

        if status == SYSEX_START {
            let end = data.iter().position(|&b| b == SYSEX_END)?;
            return Some(MidiMessage::SysEx {
                data: data[1..end].to_vec(),
            });
        }

        // Running status and system common/realtime are not relayed as typed messages
        if !is_channel_status(status) {
            return None;
        }

        let channel = status & 0x0F;
        let d1 = rest.first().map(|b| b & 0x7F);
        let d2 = rest.get(1).map(|b| b & 0x7F);

        match status & 0xF0 {
            NOTE_OFF => Some(MidiMessage::NoteOff {
                channel,
                note: d1?,
                velocity: d2?,
            }),
            NOTE_ON => Some(MidiMessage::NoteOn {
                channel,
                note: d1?,
                velocity: d2?,
            }),
            0xA0 => Some(MidiMessage::PolyPressure {
                channel,
                note: d1?,
                pressure: d2?,
            }),
            CONTROL_CHANGE => Some(MidiMessage::ControlChange {
                channel,
                cc: d1?,
                value: d2?,
            }),
            0xC0 => Some(MidiMessage::ProgramChange {
                channel,
                program: d1?,
            }),
            0xD0 => Some(MidiMessage::ChannelPressure {
                channel,
                pressure: d1?,
            }),
            PITCH_BEND => Some(MidiMessage::PitchBend {
                channel,
                value: convert::join_14bit(d1?, d2?),
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![NOTE_OFF | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![CONTROL_CHANGE | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let (lsb, msb) = convert::split_14bit(value);
                vec![PITCH_BEND | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SysEx { ref data } => {
                let mut frame = Vec::with_capacity(data.len() + 2);
                frame.push(SYSEX_START);
                frame.extend_from_slice(data);
                frame.push(SYSEX_END);
                frame
            }
        }
    }

    /// Get the channel (0-15), None for SysEx
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(channel),
            MidiMessage::SysEx { .. } => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", channel + 1, note, pressure)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel + 1, program)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// True for status bytes 0x80-0xEF
pub fn is_channel_status(status: u8) -> bool {
    (0x80..0xF0).contains(&status)
}

/// True if `data` is a complete SysEx frame (0xF0 ... 0xF7)
pub fn is_sysex_frame(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == SYSEX_START && data[data.len() - 1] == SYSEX_END
}

/// MIDI value conversion utilities
pub mod convert {
    /// Split a 14-bit value into (LSB, MSB) data bytes. Values above 16383 are clamped.
    pub fn split_14bit(value: u16) -> (u8, u8) {
        let value = value.min(super::PITCH_BEND_MAX);
        ((value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
    }

    /// Rebuild a 14-bit value from (LSB, MSB) data bytes
    pub fn join_14bit(lsb: u8, msb: u8) -> u16 {
        (((msb & 0x7F) as u16) << 7) | (lsb & 0x7F) as u16
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_note_on_parsing() {
        let msg = MidiMessage::parse(&[0x98, 60, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 8,
                note: 60,
                velocity: 100,
            }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_kept() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(msg.encode(), vec![0x90, 60, 0]);
    }

    #[test]
    fn test_truncated_channel_message() {
        assert_eq!(MidiMessage::parse(&[0xB0, 7]), None);
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0x40, 0x10, 0x10]), None);
    }

    #[test]
    fn test_sysex_parse_and_encode() {
        let frame = [0xF0, 0x00, 0x20, 0x29, 0xF7];
        let msg = MidiMessage::parse(&frame).unwrap();
        assert_eq!(
            msg,
            MidiMessage::SysEx {
                data: vec![0x00, 0x20, 0x29]
            }
        );
        assert_eq!(msg.encode(), frame.to_vec());
        assert_eq!(msg.channel(), None);
    }

    #[test]
    fn test_unterminated_sysex() {
        assert_eq!(MidiMessage::parse(&[0xF0, 0x00, 0x20]), None);
        assert!(!is_sysex_frame(&[0xF0, 0x00, 0x20]));
        assert!(is_sysex_frame(&[0xF0, 0x7E, 0xF7]));
    }

    #[test]
    fn test_pitch_bend_center() {
        assert_eq!(convert::split_14bit(PITCH_BEND_CENTER), (0, 64));
        assert_eq!(convert::join_14bit(0, 64), PITCH_BEND_CENTER);

        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::PitchBend {
                channel: 0,
                value: 8192,
            }
        );
    }

    #[test]
    fn test_pitch_bend_clamps_overflow() {
        assert_eq!(convert::split_14bit(20000), (0x7F, 0x7F));
    }

    #[test]
    fn test_display_uses_one_based_channel() {
        let msg = MidiMessage::ControlChange {
            channel: 15,
            cc: 21,
            value: 64,
        };
        assert_eq!(msg.to_string(), "CC ch:16 cc:21 v:64");
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xF0, 0x00, 0x7F]), "F0 00 7F");
        assert_eq!(format_hex(&[]), "");
    }

    proptest! {
        #[test]
        fn prop_14bit_split_join(value in 0u16..=PITCH_BEND_MAX) {
            let (lsb, msb) = convert::split_14bit(value);
            prop_assert!(lsb <= 0x7F && msb <= 0x7F);
            prop_assert_eq!(convert::join_14bit(lsb, msb), value);
        }
    }
}
