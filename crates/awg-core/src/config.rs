//! Configuration stored in awg.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::dialect::AwgModel;
use crate::protocol::{
    AckTiming, DEFAULT_ACK_MAX_POLLS, DEFAULT_ACK_POLL_INTERVAL_MS, DEFAULT_BAUD_RATE,
};
use crate::AwgError;

/// Generator connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwgConfig {
    /// Generator model, selects the command dialect
    pub model: AwgModel,

    /// Serial port name (e.g. "/dev/ttyUSB0")
    pub port: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Delay between acknowledgment polls in milliseconds
    pub ack_poll_interval_ms: u64,

    /// Empty polls tolerated before a command times out
    pub ack_max_polls: u32,
}

impl Default for AwgConfig {
    fn default() -> Self {
        Self {
            model: AwgModel::default(),
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            ack_poll_interval_ms: DEFAULT_ACK_POLL_INTERVAL_MS,
            ack_max_polls: DEFAULT_ACK_MAX_POLLS,
        }
    }
}

impl AwgConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AwgError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, AwgError> {
        let config: AwgConfig =
            serde_json::from_str(content).map_err(|e| AwgError::Config(e.to_string()))?;
        if config.baud_rate == 0 {
            return Err(AwgError::Config("baud_rate must not be 0".to_string()));
        }
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AwgError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| AwgError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Acknowledgment timing derived from the poll settings
    pub fn ack_timing(&self) -> AckTiming {
        AckTiming {
            poll_interval: Duration::from_millis(self.ack_poll_interval_ms),
            max_polls: self.ack_max_polls,
        }
    }
}
