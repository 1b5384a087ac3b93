// src/capture/pcap.rs
//
// libpcap stream encoder.
//
// Format reference: https://wiki.wireshark.org/Development/LibpcapFileFormat
//
// Global header (24 bytes, LE):
//   [magic:4][version_major:2][version_minor:2][thiszone:4][sigfigs:4][snaplen:4][network:4]
//
// Record header (16 bytes, LE):
//   [ts_sec:4][ts_usec:4][incl_len:4][orig_len:4]

use chrono::{DateTime, Utc};

use super::LinkType;

/// pcap format constants
pub mod constants {
    pub const MAGIC: u32 = 0xA1B2_C3D4;
    pub const VERSION_MAJOR: u16 = 2;
    pub const VERSION_MINOR: u16 = 4;
    pub const THISZONE: i32 = 0;
    pub const SIGFIGS: u32 = 0;
    /// Advertised only; frames are never truncated
    pub const SNAPLEN: u32 = 65535;
    pub const GLOBAL_HEADER_LEN: usize = 24;
    pub const RECORD_HEADER_LEN: usize = 16;
}

/// Build the 24-byte global header for a link type
pub fn global_header(link_type: LinkType) -> [u8; constants::GLOBAL_HEADER_LEN] {
    use constants::*;

    let mut header = [0u8; GLOBAL_HEADER_LEN];
    header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    header[4..6].copy_from_slice(&VERSION_MAJOR.to_le_bytes());
    header[6..8].copy_from_slice(&VERSION_MINOR.to_le_bytes());
    header[8..12].copy_from_slice(&THISZONE.to_le_bytes());
    header[12..16].copy_from_slice(&SIGFIGS.to_le_bytes());
    header[16..20].copy_from_slice(&SNAPLEN.to_le_bytes());
    header[20..24].copy_from_slice(&link_type.dlt().to_le_bytes());
    header
}

/// Build the 16-byte record header for a frame of `len` bytes captured at `ts`
pub fn record_header(ts: DateTime<Utc>, len: usize) -> [u8; constants::RECORD_HEADER_LEN] {
    // Seconds wrap at 32 bits, sub-second part truncated to whole microseconds
    let ts_sec = ts.timestamp() as u32;
    let ts_usec = ts.timestamp_subsec_micros();
    let len = len as u32;

    let mut header = [0u8; constants::RECORD_HEADER_LEN];
    header[0..4].copy_from_slice(&ts_sec.to_le_bytes());
    header[4..8].copy_from_slice(&ts_usec.to_le_bytes());
    header[8..12].copy_from_slice(&len.to_le_bytes());
    header[12..16].copy_from_slice(&len.to_le_bytes());
    header
}

/// Wraps frames into pcap records, prefixing the global header when a new
/// stream starts.
#[derive(Debug, Clone)]
pub struct CaptureEncoder {
    link_type: LinkType,
    header_pending: bool,
}

impl CaptureEncoder {
    pub fn new(link_type: LinkType) -> Self {
        Self {
            link_type,
            header_pending: true,
        }
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Whether the next encoded record will carry the global header
    pub fn header_pending(&self) -> bool {
        self.header_pending
    }

    /// A new stream starts; the next record carries the global header again.
    pub fn reset(&mut self) {
        self.header_pending = true;
    }

    /// Encode a frame captured now
    pub fn encode(&mut self, frame: &[u8]) -> Vec<u8> {
        self.encode_at(frame, Utc::now())
    }

    /// Encode a frame with an explicit capture timestamp.
    /// Output: `[global header if pending] + record header + frame`.
    pub fn encode_at(&mut self, frame: &[u8], ts: DateTime<Utc>) -> Vec<u8> {
        use constants::*;

        let mut out =
            Vec::with_capacity(GLOBAL_HEADER_LEN + RECORD_HEADER_LEN + frame.len());
        if self.header_pending {
            out.extend_from_slice(&global_header(self.link_type));
            self.header_pending = false;
        }
        out.extend_from_slice(&record_header(ts, frame.len()));
        out.extend_from_slice(frame);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::constants::*;
    use super::*;
    use chrono::TimeZone;

    fn le_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn test_global_header_layout() {
        let header = global_header(LinkType::Ieee802_11);
        assert_eq!(
            header.to_vec(),
            vec![
                0xD4, 0xC3, 0xB2, 0xA1, // magic
                0x02, 0x00, 0x04, 0x00, // version 2.4
                0x00, 0x00, 0x00, 0x00, // thiszone
                0x00, 0x00, 0x00, 0x00, // sigfigs
                0xFF, 0xFF, 0x00, 0x00, // snaplen 65535
                0x69, 0x00, 0x00, 0x00, // 105
            ]
        );
        assert_eq!(le_u32(&global_header(LinkType::NoHeader), 20), 101);
    }

    #[test]
    fn test_record_header_fields() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let header = record_header(ts, 20);
        assert_eq!(le_u32(&header, 0), 1_700_000_000);
        assert_eq!(le_u32(&header, 4), 123_456);
        assert_eq!(le_u32(&header, 8), 20);
        assert_eq!(le_u32(&header, 12), 20);
    }

    #[test]
    fn test_record_header_truncates_microseconds() {
        let ts = Utc.timestamp_opt(5, 999_999_999).unwrap();
        let header = record_header(ts, 0);
        assert_eq!(le_u32(&header, 0), 5);
        assert_eq!(le_u32(&header, 4), 999_999);
    }

    #[test]
    fn test_global_header_only_on_first_record() {
        let mut encoder = CaptureEncoder::new(LinkType::NoHeader);
        let frame = [0x45u8; 20];

        let first = encoder.encode(&frame);
        assert_eq!(first.len(), GLOBAL_HEADER_LEN + RECORD_HEADER_LEN + 20);
        assert_eq!(&first[..GLOBAL_HEADER_LEN], &global_header(LinkType::NoHeader)[..]);
        assert!(!encoder.header_pending());

        let second = encoder.encode(&frame);
        assert_eq!(second.len(), RECORD_HEADER_LEN + 20);
        assert_eq!(&second[RECORD_HEADER_LEN..], &frame[..]);
    }

    #[test]
    fn test_reset_reemits_global_header() {
        let mut encoder = CaptureEncoder::new(LinkType::Ieee802_11);
        encoder.encode(b"abc");
        encoder.reset();
        let again = encoder.encode(b"abc");
        assert_eq!(&again[..4], &MAGIC.to_le_bytes());
        assert_eq!(again.len(), GLOBAL_HEADER_LEN + RECORD_HEADER_LEN + 3);
    }

    #[test]
    fn test_empty_frame_record() {
        let mut encoder = CaptureEncoder::new(LinkType::NoHeader);
        encoder.encode(b"");
        let record = encoder.encode(b"");
        assert_eq!(record.len(), RECORD_HEADER_LEN);
        assert_eq!(le_u32(&record, 8), 0);
    }
}
