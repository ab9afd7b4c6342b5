//! In-memory port backend for tests

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{InputHandler, MidiSink, MidiSource, PortBackend};

#[derive(Default)]
struct FakeState {
    outputs: Vec<String>,
    inputs: Vec<String>,
    fail_virtual: bool,
    fail_real_input: bool,
    sent: Vec<(String, Vec<u8>)>,
    closed: Vec<String>,
    handlers: HashMap<String, InputHandler>,
}

/// Records every send and close; cloned handles share state
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose the four hardware ports of a device named `product`
    pub fn with_device(self, product: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.outputs.push(format!("{} MIDI In", product));
            state.outputs.push(format!("{} DAW In", product));
            state.inputs.push(format!("{} MIDI Out", product));
            state.inputs.push(format!("{} DAW Out", product));
        }
        self
    }

    pub fn fail_virtual(self) -> Self {
        self.state.lock().unwrap().fail_virtual = true;
        self
    }

    pub fn fail_real_input(self) -> Self {
        self.state.lock().unwrap().fail_real_input = true;
        self
    }

    /// Deliver `data` as if it arrived on input port `name`
    pub fn inject(&self, name: &str, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let handler = state
            .handlers
            .get_mut(name)
            .unwrap_or_else(|| panic!("no open input port '{}'", name));
        handler(data);
    }

    /// Messages sent to output port `name`, in order
    pub fn sent_to(&self, name: &str) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(port, _)| port == name)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Total number of messages sent on any port
    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    pub fn closed(&self) -> Vec<String> {
        self.state.lock().unwrap().closed.clone()
    }

    fn sink(&self, name: &str) -> Box<dyn MidiSink> {
        Box::new(FakeSink {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            open: true,
        })
    }

    fn source(&self, name: &str, handler: InputHandler) -> Box<dyn MidiSource> {
        self.state
            .lock()
            .unwrap()
            .handlers
            .insert(name.to_string(), handler);
        Box::new(FakeSource {
            name: name.to_string(),
            state: Arc::clone(&self.state),
            open: true,
        })
    }
}

impl PortBackend for FakeBackend {
    fn input_port_names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().inputs.clone())
    }

    fn output_port_names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().outputs.clone())
    }

    fn create_virtual_output(&self, name: &str) -> Result<Box<dyn MidiSink>> {
        if self.state.lock().unwrap().fail_virtual {
            bail!("virtual ports unavailable");
        }
        Ok(self.sink(name))
    }

    fn create_virtual_input(&self, name: &str, handler: InputHandler) -> Result<Box<dyn MidiSource>> {
        if self.state.lock().unwrap().fail_virtual {
            bail!("virtual ports unavailable");
        }
        Ok(self.source(name, handler))
    }

    fn connect_output(&self, name: &str) -> Result<Box<dyn MidiSink>> {
        if !self.state.lock().unwrap().outputs.iter().any(|n| n == name) {
            bail!("Output port '{}' not found", name);
        }
        Ok(self.sink(name))
    }

    fn connect_input(&self, name: &str, handler: InputHandler) -> Result<Box<dyn MidiSource>> {
        {
            let state = self.state.lock().unwrap();
            if state.fail_real_input {
                bail!("Input port '{}' is busy", name);
            }
            if !state.inputs.iter().any(|n| n == name) {
                bail!("Input port '{}' not found", name);
            }
        }
        Ok(self.source(name, handler))
    }
}

struct FakeSink {
    name: String,
    state: Arc<Mutex<FakeState>>,
    open: bool,
}

impl MidiSink for FakeSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            bail!("Port '{}' is closed", self.name);
        }
        self.state
            .lock()
            .unwrap()
            .sent
            .push((self.name.clone(), data.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.state.lock().unwrap().closed.push(self.name.clone());
        }
    }
}

struct FakeSource {
    name: String,
    state: Arc<Mutex<FakeState>>,
    open: bool,
}

impl MidiSource for FakeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.state.lock().unwrap();
            state.handlers.remove(&self.name);
            state.closed.push(self.name.clone());
        }
    }
}
