//! Serial port handling
//!
//! Port discovery and bring-up for generators attached over USB-UART, plus the [`SerialLink`]
//! abstraction the acknowledgment transport is written against.

use serialport::{ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};
use std::io::{self, Read, Write};
use std::time::Duration;

use super::DEFAULT_BAUD_RATE;
use crate::AwgError;

/// Byte-level access to a half-duplex serial channel
pub trait SerialLink {
    /// Write the whole buffer
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Number of bytes waiting in the receive buffer
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Read one byte. Only called after `bytes_to_read` reported data.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Drop whatever is waiting in the receive buffer and return how many bytes that was
    fn discard_input(&mut self) -> io::Result<usize> {
        let mut dropped = 0;
        while self.bytes_to_read()? > 0 {
            self.read_byte()?;
            dropped += 1;
        }
        Ok(dropped)
    }
}

impl SerialLink for dyn SerialPort {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(self, data)?;
        Write::flush(self)
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        SerialPort::bytes_to_read(self).map_err(io::Error::from)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        let waiting = SerialPort::bytes_to_read(self).map_err(io::Error::from)?;
        if waiting > 0 {
            self.clear(ClearBuffer::Input).map_err(io::Error::from)?;
        }
        Ok(waiting as usize)
    }
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        SerialLink::write_all(&mut **self, data)
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        SerialLink::bytes_to_read(&mut **self)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        SerialLink::read_byte(&mut **self)
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        SerialLink::discard_input(&mut **self)
    }
}

impl<L: SerialLink + ?Sized> SerialLink for &mut L {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        SerialLink::write_all(&mut **self, data)
    }

    fn bytes_to_read(&mut self) -> io::Result<u32> {
        SerialLink::bytes_to_read(&mut **self)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        SerialLink::read_byte(&mut **self)
    }

    fn discard_input(&mut self) -> io::Result<usize> {
        SerialLink::discard_input(&mut **self)
    }
}

/// USB vendor and product ID of the CH340 bridge FeelTech generators are built around
pub const CH340_USB_ID: (u16, u16) = (0x1a86, 0x7523);

/// A serial port found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS name of the port ("/dev/ttyUSB0", "COM3")
    pub name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    /// USB product string, when the bridge reports one
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            _ => Self {
                name: info.port_name,
                vid: None,
                pid: None,
                product: None,
            },
        }
    }
}

impl PortInfo {
    /// Whether the port sits behind a CH340 bridge, i.e. is likely a generator
    pub fn is_ch340(&self) -> bool {
        (self.vid, self.pid) == (Some(CH340_USB_ID.0), Some(CH340_USB_ID.1))
    }

    /// Ordering used by [`list_ports`]: CH340 bridges, then other USB ports, then everything
    /// else. Within a group, names compare by stem and then by trailing number so that
    /// `ttyUSB2` sorts before `ttyUSB10`.
    fn ordering(&self) -> (u8, &str, u64) {
        let group = if self.is_ch340() {
            0
        } else if self.vid.is_some() {
            1
        } else {
            2
        };
        let stem = self.name.trim_end_matches(|c: char| c.is_ascii_digit());
        let index = self.name[stem.len()..].parse().unwrap_or(0);
        (group, stem, index)
    }
}

/// Ports the OS reports, likely generators first
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(found) => found.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("serial port enumeration failed: {e}");
            Vec::new()
        }
    };
    ports.sort_by(|a, b| a.ordering().cmp(&b.ordering()));
    ports
}

/// Open and configure a serial port (8N1, no flow control)
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<Box<dyn SerialPort>, AwgError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    let mut port = serialport::new(name, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(100))
        .open()?;

    tracing::debug!(port = name, baud, "serial port opened");
    clear_buffers(port.as_mut())?;
    Ok(port)
}

/// Drop anything left in the receive/transmit buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), AwgError> {
    port.clear(ClearBuffer::All)?;
    Ok(())
}
