//! Command router - client commands to raw MIDI on the virtual ports
//!
//! Wire commands arrive as loose JSON objects ([`RawClientMessage`]). They are
//! validated into a [`ClientCommand`], whose variant fixes both the bytes and
//! the output port:
//! - note-on / note-off / cc-standard / pitch-bend → virtual MIDI Out
//! - cc → virtual DAW Out

use thiserror::Error;

use crate::midi::{format_hex, MidiMessage, PITCH_BEND_MAX};
use crate::ports::PortId;
use crate::protocol::RawClientMessage;
use crate::surface::{function_for_cc, function_for_note, SurfaceFunction, WHEEL_CHANNEL};


const MAX_CHANNEL: i64 = 15;
const MAX_DATA: i64 = 127;

/// A validated client command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    /// Control change on the DAW interface
    Cc { channel: u8, cc: u8, value: u8 },
    /// Control change on the performance interface
    CcStandard { channel: u8, cc: u8, value: u8 },
    PitchBend { channel: u8, value: u16 },
}

/// Why a client frame was not turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Not JSON, or not an object with a string `type`
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("'{kind}' message is missing '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("'{field}' = {value} is outside 0-{max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        max: i64,
    },
}

impl CommandError {
    /// Only malformed frames are answered; everything else is dropped quietly
    pub fn needs_reply(&self) -> bool {
        matches!(self, CommandError::Malformed(_))
    }
}

/// Bytes to send and where to send them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedMessage {
    pub port: PortId,
    pub bytes: Vec<u8>,
}

impl RoutedMessage {
    pub fn hex(&self) -> String {
        format_hex(&self.bytes)
    }
}

/// Parse one text frame from a client
pub fn parse_client_message(text: &str) -> Result<ClientCommand, CommandError> {
    let raw: RawClientMessage =
        serde_json::from_str(text).map_err(|e| CommandError::Malformed(e.to_string()))?;
    ClientCommand::try_from(raw)
}

fn required(
    kind: &str,
    field: &'static str,
    value: Option<i64>,
    max: i64,
) -> Result<i64, CommandError> {
    let value = value.ok_or_else(|| CommandError::MissingField {
        kind: kind.to_string(),
        field,
    })?;
    if !(0..=max).contains(&value) {
        return Err(CommandError::OutOfRange { field, value, max });
    }
    Ok(value)
}

fn data_byte(kind: &str, field: &'static str, value: Option<i64>) -> Result<u8, CommandError> {
    required(kind, field, value, MAX_DATA).map(|v| v as u8)
}

impl TryFrom<RawClientMessage> for ClientCommand {
    type Error = CommandError;

    fn try_from(raw: RawClientMessage) -> Result<Self, Self::Error> {
        let kind = raw.kind.as_str();
        // Type is checked before fields so unknown kinds are reported as such
        if !matches!(kind, "note-on" | "note-off" | "cc" | "cc-standard" | "pitch-bend") {
            return Err(CommandError::UnknownType(kind.to_string()));
        }

        let channel = required(kind, "channel", raw.channel, MAX_CHANNEL)? as u8;

        let command = match kind {
            "note-on" => ClientCommand::NoteOn {
                channel,
                note: data_byte(kind, "note", raw.note)?,
                velocity: data_byte(kind, "velocity", raw.velocity)?,
            },
            "note-off" => ClientCommand::NoteOff {
                channel,
                note: data_byte(kind, "note", raw.note)?,
            },
            "cc" => ClientCommand::Cc {
                channel,
                cc: data_byte(kind, "ccNumber", raw.cc_number)?,
                value: data_byte(kind, "value", raw.value)?,
            },
            "cc-standard" => ClientCommand::CcStandard {
                channel,
                cc: data_byte(kind, "ccNumber", raw.cc_number)?,
                value: data_byte(kind, "value", raw.value)?,
            },
            _ => ClientCommand::PitchBend {
                channel,
                value: required(kind, "value", raw.value, PITCH_BEND_MAX as i64)? as u16,
            },
        };

        Ok(command)
    }
}

impl ClientCommand {
    /// Wire name of the command
    pub fn kind(&self) -> &'static str {
        match self {
            ClientCommand::NoteOn { .. } => "note-on",
            ClientCommand::NoteOff { .. } => "note-off",
            ClientCommand::Cc { .. } => "cc",
            ClientCommand::CcStandard { .. } => "cc-standard",
            ClientCommand::PitchBend { .. } => "pitch-bend",
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            ClientCommand::NoteOn { channel, .. }
            | ClientCommand::NoteOff { channel, .. }
            | ClientCommand::Cc { channel, .. }
            | ClientCommand::CcStandard { channel, .. }
            | ClientCommand::PitchBend { channel, .. } => channel,
        }
    }

    /// MIDI message equivalent. Note Off is always sent with velocity 0.
    pub fn to_midi(&self) -> MidiMessage {
        match *self {
            ClientCommand::NoteOn {
                channel,
                note,
                velocity,
            } => MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
            ClientCommand::NoteOff { channel, note } => MidiMessage::NoteOff {
                channel,
                note,
                velocity: 0,
            },
            ClientCommand::Cc { channel, cc, value }
            | ClientCommand::CcStandard { channel, cc, value } => {
                MidiMessage::ControlChange { channel, cc, value }
            }
            ClientCommand::PitchBend { channel, value } => MidiMessage::PitchBend { channel, value },
        }
    }

    /// Output port for this command; always one of the virtual ports
    pub fn output_port(&self) -> PortId {
        match self {
            ClientCommand::Cc { .. } => PortId::VIRTUAL_DAW,
            _ => PortId::VIRTUAL_STANDARD,
        }
    }

    pub fn route(&self) -> RoutedMessage {
        RoutedMessage {
            port: self.output_port(),
            bytes: self.to_midi().encode(),
        }
    }

    /// Surface control the command most likely came from, for logging
    pub fn surface_function(&self) -> Option<SurfaceFunction> {
        match *self {
            ClientCommand::NoteOn { channel, note, .. } | ClientCommand::NoteOff { channel, note } => {
                function_for_note(channel, note)
            }
            ClientCommand::Cc { channel, cc, .. } | ClientCommand::CcStandard { channel, cc, .. } => {
                function_for_cc(channel, cc)
            }
            ClientCommand::PitchBend { channel, .. } if channel == WHEEL_CHANNEL => {
                Some(SurfaceFunction::Wheels)
            }
            ClientCommand::PitchBend { .. } => None,
        }
    }
}
