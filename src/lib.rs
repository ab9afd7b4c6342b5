//! Launchkey GW - MIDI bridge and display mirror for the Launchkey Mini MK4
//!
//! Exposes a stable set of virtual MIDI ports, bridges them to the hardware
//! when it is present, decodes the DAW's OLED SysEx and serves everything to
//! WebSocket clients.

pub mod bridge;
pub mod config;
pub mod display;
pub mod gateway;
pub mod hub;
pub mod midi;
pub mod ports;
pub mod protocol;
pub mod router;
pub mod server;
pub mod surface;
