//! Gateway actor
//!
//! Owns the port topology, the display store and the client hub. Inputs are
//! processed strictly one at a time:
//!
//! ```text
//!  port callbacks ──PortEvent──┐
//!                              ├──▶ Gateway ──▶ ports / clients
//!  WebSocket tasks ─Command────┘
//! ```

use std::future::Future;
use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::commands::{GatewayCommand, GatewayStatus};
use super::handle::GatewayHandle;
use crate::bridge::{self, Decoded};
use crate::display::DisplayStore;
use crate::hub::{ClientConnection, ClientHub, ClientId};
use crate::midi::{format_hex, MidiMessage};
use crate::ports::{PortEvent, PortTopology};
use crate::protocol::ServerEvent;
use crate::router::ClientCommand;

pub struct Gateway {
    topology: PortTopology,
    store: DisplayStore,
    hub: ClientHub,
    port_rx: mpsc::Receiver<PortEvent>,
    command_rx: mpsc::UnboundedReceiver<GatewayCommand>,
    closed: bool,
}

impl Gateway {
    /// Create the gateway and the handle used to reach it
    pub fn new(topology: PortTopology, port_rx: mpsc::Receiver<PortEvent>) -> (Self, GatewayHandle) {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let gateway = Self {
            topology,
            store: DisplayStore::new(),
            hub: ClientHub::new(),
            port_rx,
            command_rx,
            closed: false,
        };
        (gateway, GatewayHandle::new(cmd_tx))
    }

    /// Run until a `Shutdown` command, the `shutdown` future completing, or
    /// every handle being dropped. Ports are closed on exit.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        debug!("Gateway run loop started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(event) = self.port_rx.recv() => {
                    self.on_port_event(event);
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.on_command(cmd).is_break() {
                            info!("Gateway received shutdown command");
                            break;
                        }
                    }
                    None => {
                        debug!("All gateway handles dropped");
                        break;
                    }
                },
            }
        }

        self.close();
        info!("Gateway stopped");
    }

    /// Forward an inbound port message and feed the decode path
    pub fn on_port_event(&mut self, event: PortEvent) {
        let PortEvent { source, data } = event;
        trace!(port = %source, bytes = %format_hex(&data), "MIDI in");

        let target = bridge::forward_target(source);
        if let Some(sink) = self.topology.output(target) {
            if let Err(e) = sink.send(&data) {
                warn!(from = %source, to = %target, "Forwarding failed: {:#}", e);
            }
        }

        if !bridge::decodes(source) {
            return;
        }

        match bridge::decode(&data) {
            Decoded::Display(command) => {
                debug!(port = %source, ?command, "Display SysEx");
                if let Some(update) = self.store.apply(command) {
                    info!(
                        lines = ?update.lines,
                        persistent = update.is_persistent,
                        "OLED update"
                    );
                    self.hub.broadcast(&ServerEvent::from(update));
                }
            }
            Decoded::RejectedSysex(e) if e.is_foreign() => {
                trace!(port = %source, "Ignoring SysEx: {}", e);
            }
            Decoded::RejectedSysex(e) => {
                warn!(port = %source, bytes = %format_hex(&data), "Dropping display SysEx: {}", e);
            }
            Decoded::Echo(event) => {
                if let Some(message) = MidiMessage::parse(&data) {
                    debug!(port = %source, "MIDI echo: {}", message);
                }
                self.hub.broadcast(&event);
            }
            Decoded::Ignored => {
                trace!(port = %source, bytes = %format_hex(&data), "Not relayed to clients");
            }
        }
    }

    /// Handle one command. Returns `Break` on shutdown.
    pub fn on_command(&mut self, command: GatewayCommand) -> ControlFlow<()> {
        match command {
            GatewayCommand::Connect(client) => self.connect(client),
            GatewayCommand::Disconnect(id) => self.disconnect(id),
            GatewayCommand::Midi(command) => self.route(command),
            GatewayCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            GatewayCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn connect(&mut self, client: ClientConnection) {
        let id = client.id;
        if !self.hub.add(client) {
            return;
        }

        if let Some(update) = self.store.replay() {
            self.hub.send_to(id, &ServerEvent::from(update));
        }
        self.hub.send_to(id, &ServerEvent::connected());

        info!(client = %id, total = self.hub.len(), "WebSocket client connected");
    }

    fn disconnect(&mut self, id: ClientId) {
        if self.hub.remove(id) {
            info!(client = %id, total = self.hub.len(), "WebSocket client disconnected");
        }
    }

    fn route(&mut self, command: ClientCommand) {
        let routed = command.route();
        let Some(sink) = self.topology.output(routed.port) else {
            warn!(port = %routed.port, "No output port for {}", command.kind());
            return;
        };

        match sink.send(&routed.bytes) {
            Ok(()) => info!(
                kind = command.kind(),
                port = %routed.port,
                channel = command.channel(),
                function = command.surface_function().map(|f| f.as_str()).unwrap_or("-"),
                bytes = %routed.hex(),
                "Client command routed"
            ),
            Err(e) => warn!(
                kind = command.kind(),
                port = %routed.port,
                "Failed to send client command: {:#}",
                e
            ),
        }
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            clients: self.hub.len(),
            real_device_connected: self.topology.has_real_device(),
            virtual_ports: self.topology.virtual_port_names(),
            real_ports: self.topology.real_port_names(),
            persistent_lines: self.store.persistent_lines().to_vec(),
        }
    }

    /// Close every port and forget all clients. Safe to call twice.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.topology.close();
        self.hub.clear();
    }
}
