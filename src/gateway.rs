//! Gateway - single owner of ports, display state and clients
//!
//! Port callbacks and WebSocket tasks never touch shared state directly: they
//! feed the gateway through channels and it processes one input at a time.
//! This keeps the late-join replay ordered with respect to display broadcasts.

mod actor;
mod commands;
mod handle;


pub use actor::Gateway;
pub use commands::{GatewayCommand, GatewayStatus};
pub use handle::GatewayHandle;
