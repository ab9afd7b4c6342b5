//! Commands accepted by the gateway actor

use serde::Serialize;
use tokio::sync::oneshot;

use crate::hub::{ClientConnection, ClientId};
use crate::router::ClientCommand;

/// Commands for the gateway actor
///
/// All commands except `Status` are fire-and-forget.
#[derive(Debug)]
pub enum GatewayCommand {
    /// Register a client; it receives the persistent display replay and a greeting
    Connect(ClientConnection),

    /// Deregister a client
    Disconnect(ClientId),

    /// Route a validated client command to its output port
    Midi(ClientCommand),

    /// Snapshot of the gateway state
    Status(oneshot::Sender<GatewayStatus>),

    /// Close all ports and stop the run loop
    Shutdown,
}

/// Gateway state snapshot served by `/api/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub clients: usize,
    pub real_device_connected: bool,
    pub virtual_ports: Vec<String>,
    pub real_ports: Vec<String>,
    pub persistent_lines: Vec<String>,
}
