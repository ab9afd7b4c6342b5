//! JSON messages exchanged with WebSocket clients

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::display::OledUpdate;
use crate::midi::is_channel_status;

/// Greeting sent after a client joins
pub const CONNECTED_MESSAGE: &str = "Connected to MIDI server";
/// Reply to a frame that is not a valid command object
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid message format";

/// Server → client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    Connected {
        message: String,
    },
    OledUpdate {
        lines: Vec<String>,
        #[serde(rename = "isPersistent")]
        is_persistent: bool,
    },
    /// Raw 3-byte channel message echoed for GUI feedback
    Midi {
        #[serde(rename = "midiType")]
        midi_type: u8,
        channel: u8,
        data: u8,
        value: u8,
    },
    Error {
        error: String,
    },
}

impl ServerEvent {
    pub fn connected() -> Self {
        ServerEvent::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    /// Reply to a malformed frame. Tagged `type: "error"` like every other
    /// event; clients that only read `error` are unaffected.
    pub fn invalid_format() -> Self {
        ServerEvent::Error {
            error: INVALID_FORMAT_MESSAGE.to_string(),
        }
    }

    /// Echo event for a 3-byte channel-voice message, None for anything else
    pub fn midi_echo(data: &[u8]) -> Option<Self> {
        match *data {
            [status, d1, d2] if is_channel_status(status) => Some(ServerEvent::Midi {
                midi_type: status & 0xF0,
                channel: status & 0x0F,
                data: d1,
                value: d2,
            }),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<OledUpdate> for ServerEvent {
    fn from(update: OledUpdate) -> Self {
        ServerEvent::OledUpdate {
            lines: update.lines,
            is_persistent: update.is_persistent,
        }
    }
}

/// Client → server command as it appears on the wire. Every field is optional
/// here; [`crate::router::ClientCommand`] enforces what each kind requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub note: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub velocity: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub channel: Option<i64>,
    #[serde(
        default,
        rename = "ccNumber",
        deserialize_with = "integral",
        skip_serializing_if = "Option::is_none"
    )]
    pub cc_number: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

/// Integer field that also accepts whole-valued floats such as `64.0`.
/// Fractional values are a format error.
fn integral<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_i64() {
        return Ok(Some(n));
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(Some(f as i64)),
        _ => Err(de::Error::custom(format!("expected an integer, got {}", number))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_value(event: &ServerEvent) -> serde_json::Value {
        serde_json::from_str(&event.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_connected_shape() {
        assert_eq!(
            to_value(&ServerEvent::connected()),
            json!({"type": "connected", "message": "Connected to MIDI server"})
        );
    }

    #[test]
    fn test_oled_update_shape() {
        let event = ServerEvent::from(OledUpdate {
            lines: vec!["Hello".to_string()],
            is_persistent: true,
        });
        assert_eq!(
            to_value(&event),
            json!({"type": "oled-update", "lines": ["Hello"], "isPersistent": true})
        );
    }

    #[test]
    fn test_midi_echo_shape() {
        let event = ServerEvent::midi_echo(&[0xB8, 0x01, 0x40]).unwrap();
        assert_eq!(
            to_value(&event),
            json!({"type": "midi", "midiType": 0xB0, "channel": 8, "data": 1, "value": 64})
        );
    }

    #[test]
    fn test_midi_echo_only_for_three_byte_channel_messages() {
        assert!(ServerEvent::midi_echo(&[0xC0, 0x05]).is_none());
        assert!(ServerEvent::midi_echo(&[0xF8, 0x00, 0x00]).is_none());
        assert!(ServerEvent::midi_echo(&[0x90, 60, 100, 0]).is_none());
    }

    #[test]
    fn test_error_shape() {
        assert_eq!(
            to_value(&ServerEvent::invalid_format()),
            json!({"type": "error", "error": "Invalid message format"})
        );
    }

    #[test]
    fn test_raw_message_optional_fields() {
        let raw: RawClientMessage =
            serde_json::from_str(r#"{"type":"cc","ccNumber":115,"value":127,"channel":0}"#)
                .unwrap();
        assert_eq!(raw.kind, "cc");
        assert_eq!(raw.cc_number, Some(115));
        assert_eq!(raw.note, None);
    }

    #[test]
    fn test_raw_message_requires_type() {
        assert!(serde_json::from_str::<RawClientMessage>(r#"{"note":60}"#).is_err());
    }

    #[test]
    fn test_raw_message_accepts_whole_floats() {
        let raw: RawClientMessage =
            serde_json::from_str(r#"{"type":"note-on","note":60.0,"velocity":64.0,"channel":0}"#)
                .unwrap();
        assert_eq!(raw.note, Some(60));
        assert_eq!(raw.velocity, Some(64));

        let raw: RawClientMessage =
            serde_json::from_str(r#"{"type":"cc","ccNumber":null,"channel":-1}"#).unwrap();
        assert_eq!(raw.cc_number, None);
        assert_eq!(raw.channel, Some(-1));
    }

    #[test]
    fn test_raw_message_rejects_fractions() {
        assert!(serde_json::from_str::<RawClientMessage>(
            r#"{"type":"note-on","note":60.5,"velocity":64,"channel":0}"#
        )
        .is_err());
        assert!(
            serde_json::from_str::<RawClientMessage>(r#"{"type":"cc","value":"64"}"#).is_err()
        );
    }
}
