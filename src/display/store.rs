//! Per-target display text and the persistent-lines cache

use std::collections::HashMap;

use super::{DisplayCommand, PERSISTENT_TARGET};

/// Sparse, ordered text fields of one display target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTarget {
    fields: Vec<Option<String>>,
}

impl DisplayTarget {
    /// Overwrite one field, growing the list with unset gaps as needed
    pub fn set_field(&mut self, index: u8, text: String) {
        let index = index as usize;
        if self.fields.len() <= index {
            self.fields.resize(index + 1, None);
        }
        self.fields[index] = Some(text);
    }

    /// Text of a field; unset or out-of-range fields read as empty
    pub fn field(&self, index: u8) -> &str {
        self.fields
            .get(index as usize)
            .and_then(|f| f.as_deref())
            .unwrap_or("")
    }

    /// Set fields in field order, gaps omitted
    pub fn lines(&self) -> Vec<String> {
        self.fields.iter().flatten().cloned().collect()
    }
}

/// Rendered display content ready to be sent to clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OledUpdate {
    pub lines: Vec<String>,
    pub is_persistent: bool,
}

/// All display targets plus the lines of the last persistent render
#[derive(Debug, Default)]
pub struct DisplayStore {
    targets: HashMap<u8, DisplayTarget>,
    persistent_lines: Vec<String>,
}

impl DisplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a decoded command. Returns the update to broadcast, if any.
    pub fn apply(&mut self, command: DisplayCommand) -> Option<OledUpdate> {
        match command {
            DisplayCommand::SetField {
                target,
                field,
                text,
            } => {
                self.targets.entry(target).or_default().set_field(field, text);
                None
            }
            DisplayCommand::Trigger { target } => self.trigger(target),
        }
    }

    /// Render a target. Targets never written to render nothing.
    pub fn trigger(&mut self, target: u8) -> Option<OledUpdate> {
        let lines = self.targets.get(&target)?.lines();
        let is_persistent = target == PERSISTENT_TARGET;

        if is_persistent {
            self.persistent_lines = lines.clone();
        }

        Some(OledUpdate {
            lines,
            is_persistent,
        })
    }

    /// Update sent to a newly joined client, if persistent text was rendered
    pub fn replay(&self) -> Option<OledUpdate> {
        if self.persistent_lines.is_empty() {
            return None;
        }
        Some(OledUpdate {
            lines: self.persistent_lines.clone(),
            is_persistent: true,
        })
    }

    pub fn persistent_lines(&self) -> &[String] {
        &self.persistent_lines
    }

    pub fn target(&self, target: u8) -> Option<&DisplayTarget> {
        self.targets.get(&target)
    }
}
