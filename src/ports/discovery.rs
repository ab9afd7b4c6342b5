//! Hardware discovery by port name
//!
//! The device exposes two interfaces. From the host's point of view its
//! "MIDI In"/"DAW In" ports are outputs and its "MIDI Out"/"DAW Out" ports
//! are inputs.

use colored::*;

use super::{PortBackend, PortNames};

/// Names of the four hardware ports of one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealDevice {
    /// Output port feeding the device's performance interface
    pub midi_out: String,
    /// Output port feeding the device's DAW interface
    pub daw_out: String,
    /// Input port carrying the device's performance traffic
    pub midi_in: String,
    /// Input port carrying the device's DAW traffic
    pub daw_in: String,
}

fn is_hardware(name: &str, names: &PortNames) -> bool {
    name.contains(names.product()) && !name.contains(names.virtual_tag())
}

/// First hardware port whose name contains `suffix`, in backend enumeration
/// order. With two devices attached each role binds to the first one listed.
fn find_port(ports: &[String], names: &PortNames, suffix: &str) -> Option<String> {
    ports
        .iter()
        .find(|name| is_hardware(name, names) && name.contains(suffix))
        .cloned()
}

/// Match the four hardware ports; all four must be present. Roles are
/// matched independently, first match wins for each.
pub fn find_real_device(
    output_ports: &[String],
    input_ports: &[String],
    names: &PortNames,
) -> Option<RealDevice> {
    Some(RealDevice {
        midi_out: find_port(output_ports, names, "MIDI In")?,
        daw_out: find_port(output_ports, names, "DAW In")?,
        midi_in: find_port(input_ports, names, "MIDI Out")?,
        daw_in: find_port(input_ports, names, "DAW Out")?,
    })
}

/// Print every port the backend sees, marking ours and the device's
pub fn list_ports_formatted(backend: &dyn PortBackend, names: &PortNames) {
    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let inputs = backend.input_port_names().unwrap_or_default();
    let outputs = backend.output_port_names().unwrap_or_default();

    for (title, ports) in [("Input Ports:", &inputs), ("Output Ports:", &outputs)] {
        println!("\n{}", title.bold());
        if ports.is_empty() {
            println!("  {}", "No ports found".dimmed());
            continue;
        }
        for name in ports.iter() {
            let marker = if name.contains(names.virtual_tag()) {
                "[VIRTUAL] ".yellow()
            } else if is_hardware(name, names) {
                "[DEVICE]  ".bright_green()
            } else {
                "[OTHER]   ".normal()
            };
            println!("  {} {}", marker, name);
        }
    }

    match find_real_device(&outputs, &inputs, names) {
        Some(device) => {
            println!("\n{}", format!("Detected {}:", names.product()).bold().bright_green());
            println!("  MIDI out: {}", device.midi_out.bright_white());
            println!("  MIDI in:  {}", device.midi_in.bright_white());
            println!("  DAW out:  {}", device.daw_out.bright_white());
            println!("  DAW in:   {}", device.daw_in.bright_white());
        }
        None => {
            println!("\n{}", format!("No {} detected", names.product()).dimmed());
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn device_ports() -> (Vec<String>, Vec<String>) {
        let outputs = strings(&[
            "Midi Through Port-0",
            "Launchkey Mini MK4 VIRTUAL MIDI In",
            "Launchkey Mini MK4 MIDI In",
            "Launchkey Mini MK4 DAW In",
        ]);
        let inputs = strings(&[
            "Launchkey Mini MK4 VIRTUAL MIDI Out",
            "Launchkey Mini MK4 MIDI Out",
            "Launchkey Mini MK4 DAW Out",
        ]);
        (outputs, inputs)
    }

    #[test]
    fn test_finds_device_and_skips_virtual_ports() {
        let (outputs, inputs) = device_ports();
        let device = find_real_device(&outputs, &inputs, &PortNames::default()).unwrap();

        assert_eq!(device.midi_out, "Launchkey Mini MK4 MIDI In");
        assert_eq!(device.daw_out, "Launchkey Mini MK4 DAW In");
        assert_eq!(device.midi_in, "Launchkey Mini MK4 MIDI Out");
        assert_eq!(device.daw_in, "Launchkey Mini MK4 DAW Out");
    }

    #[test]
    fn test_missing_port_means_no_device() {
        let (outputs, mut inputs) = device_ports();
        inputs.retain(|n| !n.contains("DAW Out"));

        assert_eq!(find_real_device(&outputs, &inputs, &PortNames::default()), None);
    }

    #[test]
    fn test_only_virtual_ports_is_no_device() {
        let outputs = strings(&[
            "Launchkey Mini MK4 VIRTUAL MIDI In",
            "Launchkey Mini MK4 VIRTUAL DAW In",
        ]);
        let inputs = strings(&[
            "Launchkey Mini MK4 VIRTUAL MIDI Out",
            "Launchkey Mini MK4 VIRTUAL DAW Out",
        ]);

        assert_eq!(find_real_device(&outputs, &inputs, &PortNames::default()), None);
    }

    #[test]
    fn test_first_match_wins_with_two_devices() {
        let outputs = strings(&[
            "Launchkey Mini MK4 MIDI In",
            "Launchkey Mini MK4 DAW In",
            "Launchkey Mini MK4 #2 MIDI In",
        ]);
        let inputs = strings(&[
            "Launchkey Mini MK4 #2 MIDI Out",
            "Launchkey Mini MK4 MIDI Out",
            "Launchkey Mini MK4 DAW Out",
        ]);
        let device = find_real_device(&outputs, &inputs, &PortNames::default()).unwrap();

        assert_eq!(device.midi_out, "Launchkey Mini MK4 MIDI In");
        assert_eq!(device.midi_in, "Launchkey Mini MK4 #2 MIDI Out");
    }

    #[test]
    fn test_alsa_style_names_match_by_substring() {
        let outputs = strings(&[
            "Launchkey Mini MK4:Launchkey Mini MK4 MIDI In 24:0",
            "Launchkey Mini MK4:Launchkey Mini MK4 DAW In 24:1",
        ]);
        let inputs = strings(&[
            "Launchkey Mini MK4:Launchkey Mini MK4 MIDI Out 24:0",
            "Launchkey Mini MK4:Launchkey Mini MK4 DAW Out 24:1",
        ]);

        assert!(find_real_device(&outputs, &inputs, &PortNames::default()).is_some());
    }
}
