// src/io/serial/mod.rs
//
// Serial console transport for the bridge.
//
// Features:
// - Line framing of the console byte stream
// - Console line hygiene (trim, skip stray characters, reject invalid UTF-8)
// - Bidirectional communication (read lines + send text)

pub mod framer;
pub mod reader;
pub(crate) mod utils;

pub use framer::{LineFramer, LineFraming};
pub use reader::{list_serial_ports, SerialConfig, SerialLineTransport, SerialPortInfo};
pub use utils::Parity;
