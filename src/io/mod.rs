// src/io/mod.rs
//
// Transport abstraction for the device console.
// The bridge worker only sees `LineTransport` and `LineSink`; the serial
// module provides the production transport.

mod error;
pub mod serial;
pub mod traits;
mod types;

pub use error::IoError;
pub use traits::{LineSink, LineTransport};
pub use types::{send_text, transmit_channel, TransmitReceiver, TransmitRequest, TransmitSender};

use std::time::{SystemTime, UNIX_EPOCH};

/// Host UNIX timestamp in microseconds
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
