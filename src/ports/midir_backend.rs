//! midir implementation of the port backend
//!
//! Virtual ports use the ALSA/CoreMIDI virtual port extensions and are only
//! available on unix targets.

use anyhow::{anyhow, Context, Result};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

use super::{InputHandler, MidiSink, MidiSource, PortBackend};

/// Port backend backed by the system MIDI service
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
        }
    }

    fn input(&self) -> Result<MidiInput> {
        let mut midi_in =
            MidiInput::new(&self.client_name).context("Failed to create MIDI input")?;
        // SysEx must reach the display decoder
        midi_in.ignore(Ignore::None);
        Ok(midi_in)
    }

    fn output(&self) -> Result<MidiOutput> {
        MidiOutput::new(&self.client_name).context("Failed to create MIDI output")
    }
}

impl PortBackend for MidirBackend {
    fn input_port_names(&self) -> Result<Vec<String>> {
        let midi_in = self.input()?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect())
    }

    fn output_port_names(&self) -> Result<Vec<String>> {
        let midi_out = self.output()?;
        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|port| midi_out.port_name(port).ok())
            .collect())
    }

    #[cfg(unix)]
    fn create_virtual_output(&self, name: &str) -> Result<Box<dyn MidiSink>> {
        use midir::os::unix::VirtualOutput;

        let conn = self
            .output()?
            .create_virtual(name)
            .map_err(|e| anyhow!("Failed to create virtual output '{}': {}", name, e))?;
        debug!("Created virtual output '{}'", name);
        Ok(Box::new(MidirSink::new(name, conn)))
    }

    #[cfg(not(unix))]
    fn create_virtual_output(&self, name: &str) -> Result<Box<dyn MidiSink>> {
        anyhow::bail!("Virtual MIDI port '{}' is not supported on this platform", name)
    }

    #[cfg(unix)]
    fn create_virtual_input(
        &self,
        name: &str,
        mut handler: InputHandler,
    ) -> Result<Box<dyn MidiSource>> {
        use midir::os::unix::VirtualInput;

        let conn = self
            .input()?
            .create_virtual(name, move |_stamp, data, _| handler(data), ())
            .map_err(|e| anyhow!("Failed to create virtual input '{}': {}", name, e))?;
        debug!("Created virtual input '{}'", name);
        Ok(Box::new(MidirSource::new(name, conn)))
    }

    #[cfg(not(unix))]
    fn create_virtual_input(
        &self,
        name: &str,
        _handler: InputHandler,
    ) -> Result<Box<dyn MidiSource>> {
        anyhow::bail!("Virtual MIDI port '{}' is not supported on this platform", name)
    }

    fn connect_output(&self, name: &str) -> Result<Box<dyn MidiSink>> {
        let midi_out = self.output()?;
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("Output port '{}' not found", name))?;

        let conn = midi_out
            .connect(&port, &self.client_name)
            .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", name, e))?;
        debug!("Connected to output port '{}'", name);
        Ok(Box::new(MidirSink::new(name, conn)))
    }

    fn connect_input(&self, name: &str, mut handler: InputHandler) -> Result<Box<dyn MidiSource>> {
        let midi_in = self.input()?;
        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("Input port '{}' not found", name))?;

        let conn = midi_in
            .connect(&port, &self.client_name, move |_stamp, data, _| handler(data), ())
            .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", name, e))?;
        debug!("Connected to input port '{}'", name);
        Ok(Box::new(MidirSource::new(name, conn)))
    }
}

/// Output connection; `None` once closed
struct MidirSink {
    name: String,
    conn: Option<MidiOutputConnection>,
}

impl MidirSink {
    fn new(name: &str, conn: MidiOutputConnection) -> Self {
        Self {
            name: name.to_string(),
            conn: Some(conn),
        }
    }
}

impl MidiSink for MidirSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| anyhow!("Port '{}' is closed", self.name))?;
        conn.send(data)
            .map_err(|e| anyhow!("Failed to send to '{}': {}", self.name, e))
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
            debug!("Closed output port '{}'", self.name);
        }
    }
}

/// Input connection; dropping the connection stops the callback
struct MidirSource {
    name: String,
    conn: Option<MidiInputConnection<()>>,
}

impl MidirSource {
    fn new(name: &str, conn: MidiInputConnection<()>) -> Self {
        Self {
            name: name.to_string(),
            conn: Some(conn),
        }
    }
}

impl MidiSource for MidirSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
            debug!("Closed input port '{}'", self.name);
        }
    }
}
