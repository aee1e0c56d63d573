//! LoRa Chat CLI Configuration
//!
//! Settings come from, in increasing priority: built-in defaults, an
//! optional TOML file, and command line arguments.
//!
//! ```toml
//! [protocol]
//! max_content_bytes = 180
//!
//! [channels]
//! command_buffer_size = 32
//!
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//! ```

use std::path::Path;

use lorachat_core::{ChannelConfig, ProtocolConfig};
use lorachat_runtime::SerialConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub protocol: ProtocolConfig,
    pub channels: ChannelConfig,
    pub serial: SerialConfig,
}

impl AppConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command line values on top of the loaded configuration
    pub fn apply_overrides(&mut self, port: Option<String>, baud: Option<u32>) {
        if port.is_some() {
            self.serial.port = port;
        }
        if let Some(baud) = baud {
            self.serial.baud_rate = baud;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.protocol.validate()?;
        self.channels.validate()?;
        self.serial.validate().map_err(CliError::Config)
    }
}
