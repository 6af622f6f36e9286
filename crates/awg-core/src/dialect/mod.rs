//! Command dialects
//!
//! A dialect knows the ASCII vocabulary of one family of generators. The device asks it for a
//! [`DeviceCommand`] per attribute and channel, and takes care of formatting, dispatch and state
//! tracking itself.

mod feeltech;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::protocol::DeviceCommand;
use crate::state::{Channel, Waveform};
use crate::AwgError;

pub use feeltech::FeelTech;

/// Command vocabulary for one hardware family.
///
/// Every method covers both channels, so an implementation provides all twelve
/// attribute/channel commands. A device cannot be built without one.
pub trait Dialect: Send {
    /// Model this dialect was selected for
    fn model(&self) -> AwgModel;

    fn waveform_command(&self, channel: Channel, waveform: Waveform)
        -> Result<DeviceCommand, AwgError>;

    fn output_command(&self, channel: Channel, enabled: bool) -> Result<DeviceCommand, AwgError>;

    fn frequency_command(&self, channel: Channel, hz: u32) -> Result<DeviceCommand, AwgError>;

    /// Phase in tenths of a degree
    fn phase_command(&self, channel: Channel, deci_degrees: u32)
        -> Result<DeviceCommand, AwgError>;

    fn amplitude_command(&self, channel: Channel, mv: u32) -> Result<DeviceCommand, AwgError>;

    fn offset_command(&self, channel: Channel, mv: i32) -> Result<DeviceCommand, AwgError>;
}

/// Supported generator models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwgModel {
    /// FeelTech FY6800
    Fy6800,
    /// FeelTech FY6900
    #[default]
    Fy6900,
}

impl AwgModel {
    pub const ALL: [AwgModel; 2] = [AwgModel::Fy6800, AwgModel::Fy6900];

    /// Bind the dialect for this model
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            AwgModel::Fy6800 | AwgModel::Fy6900 => Box::new(FeelTech::new(self)),
        }
    }
}

impl FromStr for AwgModel {
    type Err = AwgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "fy6800" => Ok(AwgModel::Fy6800),
            "fy6900" => Ok(AwgModel::Fy6900),
            _ => Err(AwgError::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for AwgModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AwgModel::Fy6800 => "FY6800",
            AwgModel::Fy6900 => "FY6900",
        };
        f.write_str(name)
    }
}
