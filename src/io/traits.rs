// src/io/traits.rs
//
// Seams between the bridge worker and its collaborators.
// The worker only ever talks to a line transport and a line sink, so it can
// be driven by a serial port in production and by scripted input in tests.

use super::IoError;

/// A transport that yields decoded text lines and accepts raw bytes back.
pub trait LineTransport {
    /// Human-readable name of the underlying device (used in log lines)
    fn name(&self) -> &str;

    /// Wait up to the transport's read timeout for the next line.
    ///
    /// `Ok(None)` means nothing complete arrived in time. Errors for which
    /// [`IoError::is_fatal`] holds end the session.
    fn read_line(&mut self) -> Result<Option<String>, IoError>;

    /// Write raw bytes to the device (the send-text actuator).
    fn write_bytes(&mut self, data: &[u8]) -> Result<(), IoError>;
}

/// Receives every line that is not a packet record.
pub trait LineSink {
    fn log_line(&mut self, line: &str);
}
