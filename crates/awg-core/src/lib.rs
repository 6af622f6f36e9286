//! # awg-core
//!
//! Serial control of two-channel arbitrary waveform generators.
//!
//! This library provides:
//! - Command template formatting with checked placeholder counts
//! - A transport that writes one command and waits for its single-byte acknowledgment
//! - A per-channel mirror of the settings the generator has confirmed
//! - The FeelTech (FY6800 / FY6900) command dialect
//! - A simulated generator for demos and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use awg_core::{protocol::open_port, AwgDevice, AwgModel, Channel};
//!
//! let port = open_port("/dev/ttyUSB0", None)?;
//! let mut awg = AwgDevice::new(port, AwgModel::Fy6900.dialect());
//!
//! let defaults = awg.defaults();
//! let report = awg.initialize_report(&defaults);
//! for failed in &report.failed {
//!     eprintln!("{:?}: {}", failed.step, failed.failure.reason);
//! }
//! awg.set_channel_frequency(Channel::One, 2000);
//! ```

pub mod config;
pub mod demo;
pub mod device;
pub mod dialect;
mod error;
pub mod protocol;
pub mod state;

pub use config::AwgConfig;
pub use device::{Attribute, AwgDevice, Failure, InitReport, InitStep, Lifecycle, StepFailure};
pub use dialect::{AwgModel, Dialect};
pub use error::AwgError;
pub use state::{Channel, ChannelState, ChannelStateStore, DeviceState, Waveform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
