//! Configuration management for Launchkey GW
//!
//! Handles loading, parsing and validation of the optional YAML configuration
//! file. Every field has a default so the gateway runs without a file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::ports::PortNames;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Device naming and discovery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Product identifier used in port names and hardware discovery
    #[serde(default = "default_product_name")]
    pub product_name: String,
    /// Marker that distinguishes our virtual ports from hardware ports
    #[serde(default = "default_virtual_tag")]
    pub virtual_tag: String,
    /// MIDI client name registered with the OS backend
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Look for real hardware at startup
    #[serde(default = "default_true")]
    pub discover_hardware: bool,
}

/// Client-facing HTTP/WebSocket server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with a pre-built front-end, served as fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            virtual_tag: default_virtual_tag(),
            client_name: default_client_name(),
            discover_hardware: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path))?;

        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let device = &self.device;

        if device.product_name.trim().is_empty() {
            anyhow::bail!("device.product_name cannot be empty");
        }
        if device.virtual_tag.trim().is_empty() {
            anyhow::bail!("device.virtual_tag cannot be empty");
        }
        if device.client_name.trim().is_empty() {
            anyhow::bail!("device.client_name cannot be empty");
        }
        // Otherwise discovery would reject the real device as one of our own ports
        if device.product_name.contains(&device.virtual_tag) {
            anyhow::bail!(
                "device.product_name '{}' must not contain the virtual tag '{}'",
                device.product_name,
                device.virtual_tag
            );
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if self.server.host.trim().is_empty() {
            anyhow::bail!("server.host cannot be empty");
        }

        Ok(())
    }

    /// Port names derived from the device section
    pub fn port_names(&self) -> PortNames {
        PortNames::new(&self.device.product_name, &self.device.virtual_tag)
    }
}

// Default value functions
fn default_product_name() -> String { "Launchkey Mini MK4".to_string() }
fn default_virtual_tag() -> String { "VIRTUAL".to_string() }
fn default_client_name() -> String { "launchkey-gw".to_string() }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.device.product_name, "Launchkey Mini MK4");
        assert_eq!(config.device.virtual_tag, "VIRTUAL");
        assert!(config.device.discover_hardware);
        assert_eq!(config.server.port, 3000);
        assert!(config.server.static_dir.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
device:
  discover_hardware: false
server:
  port: 8080
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(!config.device.discover_hardware);
        assert_eq!(config.device.client_name, "launchkey-gw");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_rejects_product_containing_virtual_tag() {
        let yaml = r#"
device:
  product_name: "My VIRTUAL Keys"
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("virtual tag"));
    }

    #[test]
    fn test_rejects_zero_port() {
        let yaml = "server:\n  port: 0\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(AppConfig::from_yaml("device: [unclosed").is_err());
    }

    #[test]
    fn test_port_names_follow_device_section() {
        let yaml = r#"
device:
  product_name: "Launchkey Mini MK3"
"#;
        let names = AppConfig::from_yaml(yaml).unwrap().port_names();
        assert_eq!(names.product(), "Launchkey Mini MK3");
        assert_eq!(names.virtual_midi_out(), "Launchkey Mini MK3 VIRTUAL MIDI Out");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  host: \"127.0.0.1\"\n  port: 3100").unwrap();

        let config = AppConfig::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3100);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/launchkey-gw.yaml").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
