// src/io/error.rs
//
// Device-scoped error type for transports.
// Every variant carries the device it happened on so log lines stay attributable.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// Could not open or attach to the device
    Connection { device: String, message: String },
    /// Read from the device failed
    Read { device: String, message: String },
    /// Write to the device failed
    Write { device: String, message: String },
    /// Operation did not complete in time
    Timeout { device: String, operation: String },
    /// Device sent something we could not make sense of
    Protocol { device: String, message: String },
    /// Invalid settings for the device
    Configuration { device: String, message: String },
    /// Device went away (EOF on the port)
    Disconnected { device: String },
}

impl IoError {
    pub fn connection(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn read(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Read {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn write(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Write {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn timeout(device: impl Into<String>, operation: impl Into<String>) -> Self {
        IoError::Timeout {
            device: device.into(),
            operation: operation.into(),
        }
    }

    pub fn protocol(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Protocol {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn configuration(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Configuration {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn disconnected(device: impl Into<String>) -> Self {
        IoError::Disconnected {
            device: device.into(),
        }
    }

    /// Whether the session can keep going after this error.
    /// Read/connection failures and disconnects mean the device is gone.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IoError::Connection { .. } | IoError::Read { .. } | IoError::Disconnected { .. }
        )
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Connection { device, message } => {
                write!(f, "{}: connection failed: {}", device, message)
            }
            IoError::Read { device, message } => write!(f, "{}: read error: {}", device, message),
            IoError::Write { device, message } => {
                write!(f, "{}: write error: {}", device, message)
            }
            IoError::Timeout { device, operation } => {
                write!(f, "{}: timed out during {}", device, operation)
            }
            IoError::Protocol { device, message } => {
                write!(f, "{}: protocol error: {}", device, message)
            }
            IoError::Configuration { device, message } => {
                write!(f, "{}: invalid configuration: {}", device, message)
            }
            IoError::Disconnected { device } => write!(f, "{}: device disconnected", device),
        }
    }
}

impl std::error::Error for IoError {}
