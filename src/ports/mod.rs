//! MIDI port topology
//!
//! Four virtual ports are always opened; the matching four hardware ports are
//! opened when a real device is discovered at startup. The rest of the gateway
//! talks to ports through [`MidiSink`] / [`MidiSource`] and never sees the
//! backend library.

pub mod discovery;
pub mod midir_backend;

#[cfg(test)]
pub mod fake;

use anyhow::{Context, Result};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use discovery::{find_real_device, RealDevice};
pub use midir_backend::MidirBackend;

/// Capacity of the port event channel between backend callbacks and the gateway
pub const PORT_EVENT_CAPACITY: usize = 1024;

/// Handler invoked by the backend for every inbound message
pub type InputHandler = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Output side of a port
pub trait MidiSink {
    fn name(&self) -> &str;

    /// Fire-and-forget send of one complete message
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Close the port. Closing twice is a no-op.
    fn close(&mut self);
}

/// Input side of a port; messages are delivered to the handler given at open time
pub trait MidiSource {
    fn name(&self) -> &str;

    /// Close the port and drop its handler. Closing twice is a no-op.
    fn close(&mut self);
}

/// Port enumeration and opening, implemented once per MIDI library
pub trait PortBackend {
    fn input_port_names(&self) -> Result<Vec<String>>;
    fn output_port_names(&self) -> Result<Vec<String>>;
    fn create_virtual_output(&self, name: &str) -> Result<Box<dyn MidiSink>>;
    fn create_virtual_input(&self, name: &str, handler: InputHandler)
        -> Result<Box<dyn MidiSource>>;
    fn connect_output(&self, name: &str) -> Result<Box<dyn MidiSink>>;
    fn connect_input(&self, name: &str, handler: InputHandler) -> Result<Box<dyn MidiSource>>;
}

/// Virtual (created by us) or real (hardware)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortClass {
    Virtual,
    Real,
}

/// Which of the device's two MIDI interfaces a port belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Performance interface ("MIDI In/Out")
    Standard,
    /// Transport/mixer interface ("DAW In/Out")
    Daw,
}

/// Identity of one port within the topology. Direction is implied by use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId {
    pub class: PortClass,
    pub kind: PortKind,
}

impl PortId {
    pub const VIRTUAL_STANDARD: PortId = PortId::new(PortClass::Virtual, PortKind::Standard);
    pub const VIRTUAL_DAW: PortId = PortId::new(PortClass::Virtual, PortKind::Daw);
    pub const REAL_STANDARD: PortId = PortId::new(PortClass::Real, PortKind::Standard);
    pub const REAL_DAW: PortId = PortId::new(PortClass::Real, PortKind::Daw);

    pub const fn new(class: PortClass, kind: PortKind) -> Self {
        Self { class, kind }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            PortClass::Virtual => "virtual",
            PortClass::Real => "real",
        };
        let kind = match self.kind {
            PortKind::Standard => "midi",
            PortKind::Daw => "daw",
        };
        write!(f, "{}-{}", class, kind)
    }
}

/// Raw message received on an input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEvent {
    pub source: PortId,
    pub data: Vec<u8>,
}

/// Fixed names of the virtual ports, derived from the product name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNames {
    product: String,
    virtual_tag: String,
}

impl PortNames {
    pub fn new(product: &str, virtual_tag: &str) -> Self {
        Self {
            product: product.to_string(),
            virtual_tag: virtual_tag.to_string(),
        }
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn virtual_tag(&self) -> &str {
        &self.virtual_tag
    }

    fn virtual_name(&self, suffix: &str) -> String {
        format!("{} {} {}", self.product, self.virtual_tag, suffix)
    }

    pub fn virtual_midi_out(&self) -> String {
        self.virtual_name("MIDI Out")
    }

    pub fn virtual_midi_in(&self) -> String {
        self.virtual_name("MIDI In")
    }

    pub fn virtual_daw_out(&self) -> String {
        self.virtual_name("DAW Out")
    }

    pub fn virtual_daw_in(&self) -> String {
        self.virtual_name("DAW In")
    }
}

impl Default for PortNames {
    fn default() -> Self {
        Self::new("Launchkey Mini MK4", "VIRTUAL")
    }
}

/// One complete set of four ports (either all virtual or all real)
struct PortSet {
    midi_out: Box<dyn MidiSink>,
    daw_out: Box<dyn MidiSink>,
    midi_in: Box<dyn MidiSource>,
    daw_in: Box<dyn MidiSource>,
}

impl PortSet {
    fn output(&mut self, kind: PortKind) -> &mut dyn MidiSink {
        match kind {
            PortKind::Standard => self.midi_out.as_mut(),
            PortKind::Daw => self.daw_out.as_mut(),
        }
    }

    fn names(&self) -> Vec<String> {
        vec![
            self.midi_out.name().to_string(),
            self.midi_in.name().to_string(),
            self.daw_out.name().to_string(),
            self.daw_in.name().to_string(),
        ]
    }

    fn close(&mut self) {
        self.midi_in.close();
        self.daw_in.close();
        self.midi_out.close();
        self.daw_out.close();
    }
}

/// Open virtual ports plus the optional hardware bridge
pub struct PortTopology {
    virtual_ports: PortSet,
    real_ports: Option<PortSet>,
}

impl PortTopology {
    /// Open the four virtual ports and, if requested, discover and open the
    /// real device. Fails only when a virtual port cannot be created.
    pub fn open(
        backend: &dyn PortBackend,
        names: &PortNames,
        discover_hardware: bool,
        events: mpsc::Sender<PortEvent>,
    ) -> Result<Self> {
        let virtual_ports = open_virtual_ports(backend, names, &events)?;
        info!(
            "✅ Virtual MIDI ports created: '{}', '{}', '{}', '{}'",
            names.virtual_midi_out(),
            names.virtual_midi_in(),
            names.virtual_daw_out(),
            names.virtual_daw_in()
        );

        let real_ports = if discover_hardware {
            discover_and_open_real(backend, names, &events)
        } else {
            info!("Hardware discovery disabled, running virtual-only");
            None
        };

        Ok(Self {
            virtual_ports,
            real_ports,
        })
    }

    /// True when the hardware bridge is active
    pub fn has_real_device(&self) -> bool {
        self.real_ports.is_some()
    }

    /// Output port for `id`, None if it is a real port and no device is connected
    pub fn output(&mut self, id: PortId) -> Option<&mut dyn MidiSink> {
        match id.class {
            PortClass::Virtual => Some(self.virtual_ports.output(id.kind)),
            PortClass::Real => self.real_ports.as_mut().map(|set| set.output(id.kind)),
        }
    }

    pub fn virtual_port_names(&self) -> Vec<String> {
        self.virtual_ports.names()
    }

    pub fn real_port_names(&self) -> Vec<String> {
        self.real_ports
            .as_ref()
            .map(|set| set.names())
            .unwrap_or_default()
    }

    /// Close every open port, real ones first
    pub fn close(&mut self) {
        if let Some(real) = self.real_ports.as_mut() {
            real.close();
        }
        self.virtual_ports.close();
        debug!("All MIDI ports closed");
    }
}

/// Build an input handler that tags each message with its source port and
/// hands it to the gateway
fn forward_to(events: &mpsc::Sender<PortEvent>, source: PortId) -> InputHandler {
    let events = events.clone();
    Box::new(move |data: &[u8]| {
        let event = PortEvent {
            source,
            data: data.to_vec(),
        };
        // Never block the backend thread; a full queue drops the message
        if let Err(e) = events.try_send(event) {
            warn!(port = %source, "Dropping inbound MIDI message: {}", e);
        }
    })
}

fn open_virtual_ports(
    backend: &dyn PortBackend,
    names: &PortNames,
    events: &mpsc::Sender<PortEvent>,
) -> Result<PortSet> {
    let midi_out = backend
        .create_virtual_output(&names.virtual_midi_out())
        .context("Failed to create virtual MIDI Out port")?;
    let daw_out = backend
        .create_virtual_output(&names.virtual_daw_out())
        .context("Failed to create virtual DAW Out port")?;
    let midi_in = backend
        .create_virtual_input(
            &names.virtual_midi_in(),
            forward_to(events, PortId::VIRTUAL_STANDARD),
        )
        .context("Failed to create virtual MIDI In port")?;
    let daw_in = backend
        .create_virtual_input(
            &names.virtual_daw_in(),
            forward_to(events, PortId::VIRTUAL_DAW),
        )
        .context("Failed to create virtual DAW In port")?;

    Ok(PortSet {
        midi_out,
        daw_out,
        midi_in,
        daw_in,
    })
}

fn discover_and_open_real(
    backend: &dyn PortBackend,
    names: &PortNames,
    events: &mpsc::Sender<PortEvent>,
) -> Option<PortSet> {
    let outputs = backend.output_port_names().unwrap_or_else(|e| {
        warn!("Failed to enumerate MIDI output ports: {}", e);
        Vec::new()
    });
    let inputs = backend.input_port_names().unwrap_or_else(|e| {
        warn!("Failed to enumerate MIDI input ports: {}", e);
        Vec::new()
    });

    let Some(device) = find_real_device(&outputs, &inputs, names) else {
        info!(
            "No '{}' hardware found, running virtual-only",
            names.product()
        );
        return None;
    };

    info!("🎹 Real hardware detected - setting up bridge");
    match open_real_ports(backend, &device, events) {
        Ok(set) => {
            info!("✅ Bridge active: Real hardware ↔ Virtual ports");
            Some(set)
        }
        Err(e) => {
            warn!("Failed to open hardware ports, running virtual-only: {:#}", e);
            None
        }
    }
}

fn open_real_ports(
    backend: &dyn PortBackend,
    device: &RealDevice,
    events: &mpsc::Sender<PortEvent>,
) -> Result<PortSet> {
    // Ports opened before a failure are closed before returning
    let mut midi_out = backend.connect_output(&device.midi_out)?;
    let mut daw_out = match backend.connect_output(&device.daw_out) {
        Ok(port) => port,
        Err(e) => {
            midi_out.close();
            return Err(e);
        }
    };
    let mut midi_in = match backend
        .connect_input(&device.midi_in, forward_to(events, PortId::REAL_STANDARD))
    {
        Ok(port) => port,
        Err(e) => {
            midi_out.close();
            daw_out.close();
            return Err(e);
        }
    };
    let daw_in = match backend.connect_input(&device.daw_in, forward_to(events, PortId::REAL_DAW))
    {
        Ok(port) => port,
        Err(e) => {
            midi_in.close();
            midi_out.close();
            daw_out.close();
            return Err(e);
        }
    };

    Ok(PortSet {
        midi_out,
        daw_out,
        midi_in,
        daw_in,
    })
}
