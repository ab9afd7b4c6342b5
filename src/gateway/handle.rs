//! GatewayHandle - cloneable API for talking to the gateway actor

use tokio::sync::{mpsc, oneshot};

use super::commands::{GatewayCommand, GatewayStatus};
use crate::hub::{ClientConnection, ClientId};
use crate::router::ClientCommand;

/// Handle for interacting with the gateway
///
/// Fire-and-forget methods never block; sends to a stopped gateway are
/// silently discarded.
#[derive(Clone, Debug)]
pub struct GatewayHandle {
    cmd_tx: mpsc::UnboundedSender<GatewayCommand>,
}

impl GatewayHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<GatewayCommand>) -> Self {
        Self { cmd_tx }
    }

    pub fn connect(&self, client: ClientConnection) {
        let _ = self.cmd_tx.send(GatewayCommand::Connect(client));
    }

    pub fn disconnect(&self, id: ClientId) {
        let _ = self.cmd_tx.send(GatewayCommand::Disconnect(id));
    }

    pub fn send_command(&self, command: ClientCommand) {
        let _ = self.cmd_tx.send(GatewayCommand::Midi(command));
    }

    /// Query the gateway state; None if the gateway has stopped
    pub async fn status(&self) -> Option<GatewayStatus> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(GatewayCommand::Status(tx)).ok()?;
        rx.await.ok()
    }

    /// Check if the gateway is still running
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Ask the gateway to close its ports and stop
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(GatewayCommand::Shutdown);
    }
}
