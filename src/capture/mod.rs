// src/capture/mod.rs
//
// Packet capture path: marker extraction, payload decoding, pcap encoding,
// and the FIFO that Wireshark reads from.
//
// line -> extractor -> decoder -> pcap encoder -> fifo sink

pub mod decoder;
pub mod extractor;
pub mod fifo;
pub mod pcap;
pub mod session;

pub use decoder::{decode_payload, DecodeError, DecoderConfig};
pub use extractor::{extract, Extracted, DEFAULT_MARKER};
pub use fifo::{FifoState, PipeSink, WriteOutcome};
pub use pcap::CaptureEncoder;
pub use session::{CaptureSession, FrameOutcome};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default FIFO location Wireshark is pointed at (`wireshark -k -i /tmp/sniff`)
pub const DEFAULT_FIFO_PATH: &str = "/tmp/sniff";

/// One link-layer capture unit. Captured and original length are the same.
pub type RawFrame = Vec<u8>;

// ============================================================================
// Configuration Types
// ============================================================================

/// How the payload after the packet marker is encoded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FrameEncoding {
    /// ASCII hex digits, as printed by the lwIP hook
    #[default]
    HexText,
    /// Payload bytes are the frame itself (802.11 sniffer firmware)
    RawBytes,
}

/// pcap link-layer type written into the global header.
/// See https://www.tcpdump.org/linktypes.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// LINKTYPE_RAW: IP packets without a link-layer header
    NoHeader,
    /// LINKTYPE_IEEE802_11: 802.11 MAC frames
    #[serde(rename = "ieee802_11")]
    #[value(name = "ieee802-11")]
    Ieee802_11,
}

impl LinkType {
    pub fn dlt(self) -> u32 {
        match self {
            LinkType::NoHeader => 101,
            LinkType::Ieee802_11 => 105,
        }
    }
}

impl FrameEncoding {
    /// Link type that matches what each firmware variant prints
    pub fn default_link_type(self) -> LinkType {
        match self {
            FrameEncoding::HexText => LinkType::NoHeader,
            FrameEncoding::RawBytes => LinkType::Ieee802_11,
        }
    }
}

/// What to do with a hex payload that has an odd number of digits
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OddDigitPolicy {
    /// Append a single '0' and decode. Assumes only the final nibble was lost.
    #[default]
    PadZero,
    /// Treat the frame as corrupt
    Drop,
}

/// Everything the capture path needs, fixed for the lifetime of a session
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureConfig {
    pub fifo_path: PathBuf,
    pub link_type: LinkType,
    pub marker: String,
    pub decoder: DecoderConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let decoder = DecoderConfig::default();
        CaptureConfig {
            fifo_path: PathBuf::from(DEFAULT_FIFO_PATH),
            link_type: decoder.encoding.default_link_type(),
            marker: DEFAULT_MARKER.to_string(),
            decoder,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Resource errors on the FIFO path. Fatal for the capture session.
#[derive(Debug)]
pub enum CaptureError {
    /// Something other than a FIFO already lives at the path
    NotAFifo(PathBuf),
    /// mkfifo failed for a reason other than the path existing
    CreateFailed(PathBuf, std::io::Error),
    /// The path could not be inspected
    StatFailed(PathBuf, std::io::Error),
    /// Path cannot be handed to the OS (interior NUL)
    InvalidPath(PathBuf),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NotAFifo(p) => {
                write!(f, "{} exists and is not a FIFO queue", p.display())
            }
            CaptureError::CreateFailed(p, e) => {
                write!(f, "can not create FIFO queue at {}: {}", p.display(), e)
            }
            CaptureError::StatFailed(p, e) => {
                write!(f, "can not inspect {}: {}", p.display(), e)
            }
            CaptureError::InvalidPath(p) => write!(f, "invalid FIFO path {:?}", p),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::CreateFailed(_, e) | CaptureError::StatFailed(_, e) => Some(e),
            _ => None,
        }
    }
}
