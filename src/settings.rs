// src/settings.rs
//
// Bridge settings: serde defaults, optional TOML file, CLI overrides applied
// by main.rs on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{
    CaptureConfig, DecoderConfig, FrameEncoding, LinkType, OddDigitPolicy, DEFAULT_FIFO_PATH,
    DEFAULT_MARKER,
};
use crate::io::serial::{LineFraming, Parity, SerialConfig};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BridgeSettings {
    pub device: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub read_timeout_ms: u64,
    pub fifo_path: PathBuf,
    pub frame_encoding: FrameEncoding,
    /// Follows frame_encoding when unset
    pub link_type: Option<LinkType>,
    pub marker: String,
    pub min_header_words: u8,
    pub odd_digit_policy: OddDigitPolicy,
    /// Copy of every console line, like the monitor's "Save serial log"
    pub serial_log: Option<PathBuf>,
    /// Directory for the bridge's own timestamped log files
    pub log_dir: Option<PathBuf>,
}

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    2_000_000
}
fn default_read_timeout_ms() -> u64 {
    1000
}

impl Default for BridgeSettings {
    fn default() -> Self {
        let decoder = DecoderConfig::default();
        BridgeSettings {
            device: default_device(),
            baud_rate: default_baud_rate(),
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            read_timeout_ms: default_read_timeout_ms(),
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            frame_encoding: decoder.encoding,
            link_type: None,
            marker: DEFAULT_MARKER.to_string(),
            min_header_words: decoder.min_header_words,
            odd_digit_policy: decoder.odd_digit_policy,
            serial_log: None,
            log_dir: None,
        }
    }
}

impl BridgeSettings {
    /// Load settings from a TOML file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let settings: BridgeSettings =
            toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.device.is_empty() {
            return Err("device must not be empty".to_string());
        }
        if self.baud_rate == 0 {
            return Err("baud_rate must be greater than zero".to_string());
        }
        if self.read_timeout_ms == 0 {
            return Err("read_timeout_ms must be greater than zero".to_string());
        }
        if self.marker.is_empty() {
            return Err("marker must not be empty".to_string());
        }
        if self.min_header_words > 0x0F {
            return Err(format!(
                "min_header_words {} does not fit the 4-bit header length field",
                self.min_header_words
            ));
        }
        if self.fifo_path.as_os_str().is_empty() {
            return Err("fifo_path must not be empty".to_string());
        }
        Ok(())
    }

    pub fn effective_link_type(&self) -> LinkType {
        self.link_type
            .unwrap_or_else(|| self.frame_encoding.default_link_type())
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.device.clone(),
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            stop_bits: self.stop_bits,
            parity: self.parity,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            framing: LineFraming::default(),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            fifo_path: self.fifo_path.clone(),
            link_type: self.effective_link_type(),
            marker: self.marker.clone(),
            decoder: DecoderConfig {
                encoding: self.frame_encoding,
                min_header_words: self.min_header_words,
                odd_digit_policy: self.odd_digit_policy,
            },
        }
    }
}
