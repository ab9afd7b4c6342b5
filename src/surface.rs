//! Launchkey Mini MK4 surface layout
//!
//! Fixed channel and controller assignments used by the on-screen surface and
//! by the hardware. Nothing here is negotiated at runtime.

/// Logical surface function, used to label routed traffic in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFunction {
    /// Drum pads (notes 96-103, 112-119)
    Pads,
    /// Piano keys
    Keys,
    /// Pitch and modulation wheels
    Wheels,
    /// Rotary knobs sent as CC
    Knobs,
    /// Transport / DAW buttons
    Transport,
}

impl SurfaceFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceFunction::Pads => "pads",
            SurfaceFunction::Keys => "keys",
            SurfaceFunction::Wheels => "wheels",
            SurfaceFunction::Knobs => "knobs",
            SurfaceFunction::Transport => "transport",
        }
    }
}

/// Channel (0-based) carrying pad notes
pub const PAD_CHANNEL: u8 = 0;
/// Channel carrying transport button CCs (routed to the DAW port)
pub const TRANSPORT_CHANNEL: u8 = 0;
/// Channel carrying key notes
pub const KEY_CHANNEL: u8 = 8;
/// Channel carrying pitch bend and mod wheel
pub const WHEEL_CHANNEL: u8 = 8;
/// Channel carrying knob CCs
pub const KNOB_CHANNEL: u8 = 15;

/// CC numbers of the 8 knobs
pub const KNOB_CCS: [u8; 8] = [21, 22, 23, 24, 25, 26, 27, 28];

/// Mod wheel CC
pub const MOD_WHEEL_CC: u8 = 1;

/// Pad notes, top row then bottom row
pub const PAD_NOTES: [u8; 16] = [
    96, 97, 98, 99, 100, 101, 102, 103, //
    112, 113, 114, 115, 116, 117, 118, 119,
];

/// Lowest key (C3)
pub const KEY_START_NOTE: u8 = 48;
/// Number of keys on the keybed
pub const KEY_COUNT: u8 = 25;

/// Transport button CCs. `nav_up`/`nav_down` share CCs with `up`/`down` on
/// current firmware mappings and are kept as separate entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCcs {
    pub shift: u8,
    pub play: u8,
    pub record: u8,
    pub up: u8,
    pub down: u8,
    pub nav_up: u8,
    pub nav_down: u8,
}

pub const TRANSPORT_CCS: TransportCcs = TransportCcs {
    shift: 63,
    play: 115,
    record: 117,
    up: 51,
    down: 52,
    nav_up: 51,
    nav_down: 52,
};

/// Best-effort label for a channel; channels shared by several functions
/// resolve to the function that owns the port traffic.
pub fn function_for_note(channel: u8, note: u8) -> Option<SurfaceFunction> {
    match channel {
        PAD_CHANNEL if PAD_NOTES.contains(&note) => Some(SurfaceFunction::Pads),
        KEY_CHANNEL if (KEY_START_NOTE..KEY_START_NOTE + KEY_COUNT).contains(&note) => {
            Some(SurfaceFunction::Keys)
        }
        _ => None,
    }
}

/// Label a control change by its channel and controller number
pub fn function_for_cc(channel: u8, cc: u8) -> Option<SurfaceFunction> {
    match channel {
        KNOB_CHANNEL if KNOB_CCS.contains(&cc) => Some(SurfaceFunction::Knobs),
        WHEEL_CHANNEL if cc == MOD_WHEEL_CC => Some(SurfaceFunction::Wheels),
        TRANSPORT_CHANNEL if is_transport_cc(cc) => Some(SurfaceFunction::Transport),
        _ => None,
    }
}

fn is_transport_cc(cc: u8) -> bool {
    let t = TRANSPORT_CCS;
    [t.shift, t.play, t.record, t.up, t.down, t.nav_up, t.nav_down].contains(&cc)
}
