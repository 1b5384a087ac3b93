// src/io/serial/reader.rs
//
// Serial console transport.
// Reads the device console byte stream, cuts it into lines, and writes
// send-text requests back to the port.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};

use super::framer::{decode_line, DecodedLine, LineFramer, LineFraming, RawLine};
use super::utils::{
    console_flow_control, to_serialport_data_bits, to_serialport_parity,
    to_serialport_stop_bits, Parity,
};
use crate::io::{IoError, LineTransport};

// ============================================================================
// Types and Configuration
// ============================================================================

/// Serial port configuration for the device console
#[derive(Clone, Debug)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// Upper bound on how long a single read_line() may wait
    pub read_timeout: Duration,
    pub framing: LineFraming,
}

/// Information about an available serial port
#[derive(Clone, Debug)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

// ============================================================================
// Serial Line Transport
// ============================================================================

/// Line transport over a serial port.
pub struct SerialLineTransport {
    config: SerialConfig,
    port: Box<dyn SerialPort>,
    framer: LineFramer,
    /// Lines already cut from the stream but not yet handed out
    ready: VecDeque<String>,
    buf: [u8; 256],
}

impl SerialLineTransport {
    /// Open the port and start from a clean slate (both directions flushed).
    pub fn open(config: SerialConfig) -> Result<Self, IoError> {
        // Short per-read timeout; read_line() loops up to config.read_timeout
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(to_serialport_data_bits(config.data_bits))
            .stop_bits(to_serialport_stop_bits(config.stop_bits))
            .parity(to_serialport_parity(config.parity))
            .flow_control(console_flow_control())
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| IoError::connection(&config.port, e.to_string()))?;

        port.clear(ClearBuffer::All)
            .map_err(|e| IoError::connection(&config.port, format!("clear buffers: {}", e)))?;

        tlog!(
            "[serial] Opened {} at {} baud ({}{}{})",
            config.port,
            config.baud_rate,
            config.data_bits,
            config.parity.letter(),
            config.stop_bits
        );

        let framer = LineFramer::new(config.framing.clone());
        Ok(Self {
            config,
            port,
            framer,
            ready: VecDeque::new(),
            buf: [0u8; 256],
        })
    }

    fn queue_lines(&mut self, n: usize) {
        for raw in self.framer.feed(&self.buf[..n]) {
            if let Some(line) = console_line(&self.config, &raw) {
                self.ready.push_back(line);
            }
        }
    }
}

/// Turn one framed line into console text, or drop it.
///
/// Pieces of an over-long line are dropped whole: a split packet record
/// would decode into a truncated frame.
fn console_line(config: &SerialConfig, raw: &RawLine) -> Option<String> {
    if raw.incomplete {
        tlog!(
            "[serial] {}: dropping {} bytes of a line longer than {} bytes",
            config.port,
            raw.bytes.len(),
            config.framing.max_length
        );
        return None;
    }
    match decode_line(&raw.bytes) {
        DecodedLine::Text(line) => Some(line),
        DecodedLine::Empty => None,
        DecodedLine::Invalid(e) => {
            tlog!(
                "[serial] {}: could not decode line {:?}: {}",
                config.port,
                String::from_utf8_lossy(&raw.bytes),
                e
            );
            None
        }
    }
}

impl LineTransport for SerialLineTransport {
    fn name(&self) -> &str {
        &self.config.port
    }

    fn read_line(&mut self) -> Result<Option<String>, IoError> {
        let deadline = Instant::now() + self.config.read_timeout;

        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }

            match self.port.read(&mut self.buf) {
                Ok(0) => {
                    // EOF - port closed/disconnected
                    return Err(IoError::disconnected(&self.config.port));
                }
                Ok(n) => self.queue_lines(n),
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    // Timeout is expected for serial reads
                }
                Err(e) => return Err(IoError::read(&self.config.port, e.to_string())),
            }
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<(), IoError> {
        self.port
            .write_all(data)
            .and_then(|_| self.port.flush())
            .map_err(|e| IoError::write(&self.config.port, e.to_string()))
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// List available serial ports
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The tty devices block on open waiting for carrier detect.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    "USB".to_string(),
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::PciPort => {
                    ("PCI".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => {
                    ("Unknown".to_string(), None, None, None, None, None)
                }
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect())
}

impl SerialPortInfo {
    /// One-line description for `--list-ports`
    pub fn describe(&self) -> String {
        let mut out = format!("{} ({})", self.port_name, self.port_type);
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            out.push_str(&format!(" {:04x}:{:04x}", vid, pid));
        }
        if let Some(product) = &self.product {
            out.push_str(&format!(" {}", product));
        }
        if let Some(manufacturer) = &self.manufacturer {
            out.push_str(&format!(" [{}]", manufacturer));
        }
        if let Some(serial) = &self.serial_number {
            out.push_str(&format!(" s/n {}", serial));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(max_length: usize) -> SerialConfig {
        SerialConfig {
            port: "/dev/does-not-exist-sniffpipe".to_string(),
            baud_rate: 2_000_000,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            read_timeout: Duration::from_millis(10),
            framing: LineFraming {
                delimiter: vec![b'\n'],
                max_length,
            },
        }
    }

    #[test]
    fn test_open_missing_port_is_connection_error() {
        match SerialLineTransport::open(test_config(16 * 1024)) {
            Err(err) => {
                assert!(matches!(err, IoError::Connection { .. }));
                assert!(err.is_fatal());
            }
            Ok(_) => panic!("opening a missing port should fail"),
        }
    }

    #[test]
    fn test_describe_usb_port() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyUSB0".to_string(),
            port_type: "USB".to_string(),
            manufacturer: Some("Silicon Labs".to_string()),
            product: Some("CP2102".to_string()),
            serial_number: Some("0001".to_string()),
            vid: Some(0x10c4),
            pid: Some(0xea60),
        };
        assert_eq!(
            info.describe(),
            "/dev/ttyUSB0 (USB) 10c4:ea60 CP2102 [Silicon Labs] s/n 0001"
        );
    }

    #[test]
    fn test_oversized_packet_line_never_reaches_bridge() {
        let config = test_config(8);
        let mut framer = LineFramer::new(config.framing.clone());
        let raw = framer.feed(b"#pkt#450000140001\nboot ok\n");

        let lines: Vec<String> = raw
            .iter()
            .filter_map(|r| console_line(&config, r))
            .collect();
        assert_eq!(lines, vec!["boot ok".to_string()]);
    }

    #[test]
    fn test_console_line_hygiene() {
        let config = test_config(64);
        let line = |bytes: &[u8]| {
            console_line(
                &config,
                &RawLine {
                    bytes: bytes.to_vec(),
                    incomplete: false,
                },
            )
        };
        assert_eq!(line(b" [WF] up\r"), Some("[WF] up".to_string()));
        assert_eq!(line(b"x"), None);
        assert_eq!(line(&[0xC3, 0x28, 0x41]), None);
    }
}
