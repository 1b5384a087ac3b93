// src/io/serial/framer.rs
//
// Delimiter-based framing for the device console.
// Splits the raw serial byte stream into lines and applies the console's
// line hygiene (trim, skip near-empty lines, reject invalid UTF-8).

use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// Framing parameters for the console stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFraming {
    /// Delimiter byte sequence (e.g., [0x0A] for LF)
    pub delimiter: Vec<u8>,
    /// Max line length before forced split
    pub max_length: usize,
}

impl Default for LineFraming {
    fn default() -> Self {
        LineFraming {
            delimiter: vec![b'\n'],
            // A 1500 byte MTU frame is 3000 hex digits plus the marker
            max_length: 16 * 1024,
        }
    }
}

/// One line cut from the serial stream, before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    /// Line bytes without the delimiter
    pub bytes: Vec<u8>,
    /// True when the line was force-split at max length, is the tail of such a
    /// line, or came from flush()
    pub incomplete: bool,
}

/// Outcome of decoding a raw line into console text
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    /// Usable text, whitespace trimmed
    Text(String),
    /// Nothing worth forwarding (blank or a single stray character)
    Empty,
    /// Bytes were not valid UTF-8
    Invalid(std::str::Utf8Error),
}

// =============================================================================
// Line Framer
// =============================================================================

/// Stateful delimiter framer for streaming data.
pub struct LineFramer {
    buffer: Vec<u8>,
    delimiter: Vec<u8>,
    max_length: usize,
    /// A forced split happened since the last delimiter
    overflowed: bool,
}

impl LineFramer {
    pub fn new(framing: LineFraming) -> Self {
        LineFramer {
            buffer: Vec::new(),
            delimiter: framing.delimiter,
            max_length: framing.max_length.max(1),
            overflowed: false,
        }
    }

    /// Feed raw bytes into the framer.
    /// Returns any complete lines that were parsed.
    pub fn feed(&mut self, data: &[u8]) -> Vec<RawLine> {
        let mut lines = Vec::new();

        for &byte in data {
            self.buffer.push(byte);

            if !self.delimiter.is_empty() && self.buffer.len() >= self.delimiter.len() {
                let start = self.buffer.len() - self.delimiter.len();
                if self.buffer[start..] == self.delimiter[..] {
                    let line: Vec<u8> = self.buffer.drain(..start).collect();
                    self.buffer.clear();
                    if !line.is_empty() {
                        lines.push(RawLine {
                            bytes: line,
                            incomplete: self.overflowed,
                        });
                    }
                    self.overflowed = false;
                    continue;
                }
            }

            if self.buffer.len() >= self.max_length {
                self.overflowed = true;
                let line: Vec<u8> = self.buffer.drain(..).collect();
                lines.push(RawLine {
                    bytes: line,
                    incomplete: true,
                });
            }
        }

        lines
    }

    /// Flush any remaining buffered data as an incomplete line.
    /// Call when the stream ends.
    pub fn flush(&mut self) -> Option<RawLine> {
        self.overflowed = false;
        if self.buffer.is_empty() {
            None
        } else {
            Some(RawLine {
                bytes: self.buffer.drain(..).collect(),
                incomplete: true,
            })
        }
    }
}

/// Decode a raw line the way the console monitor always has:
/// trim surrounding ASCII whitespace (this also eats the `\r` of CRLF),
/// ignore anything of length one or less, then require valid UTF-8.
pub fn decode_line(bytes: &[u8]) -> DecodedLine {
    let trimmed = bytes.trim_ascii();
    if trimmed.len() <= 1 {
        return DecodedLine::Empty;
    }
    match std::str::from_utf8(trimmed) {
        Ok(s) => DecodedLine::Text(s.to_string()),
        Err(e) => DecodedLine::Invalid(e),
    }
}
