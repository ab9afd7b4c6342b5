//! Event bridge - forwarding table between virtual and real ports
//!
//! Traffic only ever crosses between the two classes, keeping the interface
//! (standard or DAW):
//!
//! ```text
//! virtual MIDI In  → real MIDI Out   (not decoded)
//! virtual DAW In   → real DAW Out    + decode
//! real MIDI In     → virtual MIDI Out + decode
//! real DAW In      → virtual DAW Out  + decode
//! ```

use crate::display::{self, DisplayCommand, SysexError};
use crate::midi::is_sysex_frame;
use crate::ports::{PortClass, PortId, PortKind};
use crate::protocol::ServerEvent;

/// Output a message from `source` is forwarded to
pub fn forward_target(source: PortId) -> PortId {
    let class = match source.class {
        PortClass::Virtual => PortClass::Real,
        PortClass::Real => PortClass::Virtual,
    };
    PortId::new(class, source.kind)
}

/// Whether traffic from `source` goes through the decode path. Performance
/// traffic written by the host is not mirrored back to clients.
pub fn decodes(source: PortId) -> bool {
    !(source.class == PortClass::Virtual && source.kind == PortKind::Standard)
}

/// Result of the decode path for one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Display SysEx for the store
    Display(DisplayCommand),
    /// SysEx that was not a usable display command
    RejectedSysex(SysexError),
    /// Channel message echoed to clients
    Echo(ServerEvent),
    /// Anything else
    Ignored,
}

/// Classify an inbound message on the decode path
pub fn decode(data: &[u8]) -> Decoded {
    if is_sysex_frame(data) {
        return match display::decode(data) {
            Ok(command) => Decoded::Display(command),
            Err(e) => Decoded::RejectedSysex(e),
        };
    }
    match ServerEvent::midi_echo(data) {
        Some(event) => Decoded::Echo(event),
        None => Decoded::Ignored,
    }
}
