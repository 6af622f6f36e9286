//! Serial Protocol Communication
//!
//! ASCII commands terminated by a line feed, each answered by a single acknowledgment byte.

pub mod formatter;
pub mod serial;
mod transport;

pub use formatter::{format_command, placeholder_count, DeviceCommand};
pub use serial::{clear_buffers, list_ports, open_port, PortInfo, SerialLink, CH340_USB_ID};
pub use transport::{AckTiming, AckTransport};

/// Default baud rate of the FeelTech USB-UART bridge
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Byte the generator answers with when it accepted a command
pub const ACK_BYTE: u8 = 0x0a;

/// Delay between two receive-buffer checks while waiting for an acknowledgment
pub const DEFAULT_ACK_POLL_INTERVAL_MS: u64 = 1;

/// Number of empty checks before a command is considered unanswered (~1s in total)
pub const DEFAULT_ACK_MAX_POLLS: u32 = 1000;
