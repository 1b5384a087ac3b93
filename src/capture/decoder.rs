// src/capture/decoder.rs
//
// Payload decoding for packet records.
//
// HexText payloads are what the lwIP capture hook prints: the IP packet as
// hex digits, e.g. `4500001c...`. RawBytes payloads are already the frame.
//
// Hex payload layout relied on for validation:
//   digit 0: IP version nibble
//   digit 1: IHL nibble, header length in 32-bit words (minimum 5 = 20 bytes)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{FrameEncoding, OddDigitPolicy, RawFrame};

/// Smallest IPv4 header, in 32-bit words
pub const MIN_IPV4_HEADER_WORDS: u8 = 5;

/// Decoder settings chosen at configuration time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub encoding: FrameEncoding,
    /// Frames whose header-length nibble is below this are dropped (HexText only)
    pub min_header_words: u8,
    pub odd_digit_policy: OddDigitPolicy,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            encoding: FrameEncoding::HexText,
            min_header_words: MIN_IPV4_HEADER_WORDS,
            odd_digit_policy: OddDigitPolicy::PadZero,
        }
    }
}

/// Why a payload did not become a frame. Every variant means "drop and log".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Too short to carry the header-length field
    Truncated { digits: usize },
    /// Header-length field below the configured minimum
    HeaderTooShort { words: u8, min: u8 },
    /// Odd digit count and the policy says drop
    OddDigitCount { digits: usize },
    /// Not a hex string
    InvalidHex(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { digits } => {
                write!(f, "payload too short for a header ({} digits)", digits)
            }
            DecodeError::HeaderTooShort { words, min } => write!(
                f,
                "invalid header length {} words ({} bytes), need at least {}",
                words,
                *words as usize * 4,
                min
            ),
            DecodeError::OddDigitCount { digits } => {
                write!(f, "odd number of hex digits ({})", digits)
            }
            DecodeError::InvalidHex(e) => write!(f, "not a hex payload: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Turn a marker-stripped payload into a frame.
///
/// Never panics; every malformed input comes back as a `DecodeError`.
pub fn decode_payload(payload: &str, config: &DecoderConfig) -> Result<RawFrame, DecodeError> {
    match config.encoding {
        FrameEncoding::RawBytes => Ok(payload.as_bytes().to_vec()),
        FrameEncoding::HexText => decode_hex(payload, config),
    }
}

fn decode_hex(payload: &str, config: &DecoderConfig) -> Result<RawFrame, DecodeError> {
    let digits = payload.len();

    let ihl = payload
        .as_bytes()
        .get(1)
        .ok_or(DecodeError::Truncated { digits })?;
    let words = (*ihl as char)
        .to_digit(16)
        .ok_or_else(|| DecodeError::InvalidHex(format!("header length digit {:?}", *ihl as char)))?
        as u8;
    if words < config.min_header_words {
        return Err(DecodeError::HeaderTooShort {
            words,
            min: config.min_header_words,
        });
    }

    if digits % 2 == 0 {
        return hex::decode(payload).map_err(|e| DecodeError::InvalidHex(e.to_string()));
    }

    match config.odd_digit_policy {
        OddDigitPolicy::Drop => Err(DecodeError::OddDigitCount { digits }),
        OddDigitPolicy::PadZero => {
            let mut padded = String::with_capacity(digits + 1);
            padded.push_str(payload);
            padded.push('0');
            hex::decode(&padded).map_err(|e| DecodeError::InvalidHex(e.to_string()))
        }
    }
}
