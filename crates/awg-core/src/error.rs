//! Error types

use thiserror::Error;

/// Errors that can occur while talking to a waveform generator
#[derive(Error, Debug)]
pub enum AwgError {
    #[error("Template '{template}' has {placeholders} placeholder(s) but {params} parameter(s) were supplied")]
    FormatMismatch {
        template: String,
        placeholders: usize,
        params: usize,
    },

    #[error("Unsupported placeholder '%{conversion}' in template '{template}'")]
    UnsupportedPlaceholder { template: String, conversion: char },

    #[error("Field width in template '{template}' exceeds {max}")]
    WidthTooLarge { template: String, max: usize },

    #[error("Too many parameters: {0} (at most 2)")]
    TooManyParams(usize),

    #[error("No acknowledgment within {waited_ms}ms")]
    AckTimeout { waited_ms: u64 },

    #[error("Acknowledgment rejected: got {0:#04x}, expected 0x0a")]
    AckRejected(u8),

    #[error("{failed} of {total} initialization steps failed")]
    PartialInit { failed: usize, total: usize },

    #[error("Waveform {0:?} is not supported by this dialect")]
    UnsupportedWaveform(crate::state::Waveform),

    #[error("Unknown waveform: {0}")]
    UnknownWaveform(String),

    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i64 },

    #[error("Invalid channel {0} (expected 1 or 2)")]
    InvalidChannel(u8),

    #[error("Unknown AWG model: {0}")]
    UnknownModel(String),

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for AwgError {
    fn from(e: serialport::Error) -> Self {
        AwgError::Serial(e.to_string())
    }
}
