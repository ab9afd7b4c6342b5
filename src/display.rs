//! OLED display mirroring
//!
//! The DAW drives the device's screen with Novation SysEx frames: text fields
//! are written per target, then a trigger renders the target. This module
//! decodes those frames and keeps the per-target text so it can be mirrored
//! to clients.

mod store;
mod sysex;

pub use store::{DisplayStore, DisplayTarget, OledUpdate};
pub use sysex::{
    decode, DisplayCommand, SysexError, CMD_SET_FIELD, CMD_TRIGGER, HEADER_LEN, MANUFACTURER_ID,
    PRODUCT_ID, TRIGGER_MARKER,
};

/// Target rendered as persistent text (survives until replaced)
pub const PERSISTENT_TARGET: u8 = 0x20;
/// Target rendered as temporary text
pub const TEMPORARY_TARGET: u8 = 0x21;
