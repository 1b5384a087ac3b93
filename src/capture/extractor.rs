// src/capture/extractor.rs
//
// Packet record detection on console lines.

/// Prefix the firmware prints in front of every captured packet
pub const DEFAULT_MARKER: &str = "#pkt#";

/// Where a console line goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extracted<'a> {
    /// Payload after the marker, bound for the decoder
    Packet(&'a str),
    /// Ordinary console output, untouched
    Log(&'a str),
}

/// Route one line: packet payload if it starts with `marker`, log otherwise.
pub fn extract<'a>(line: &'a str, marker: &str) -> Extracted<'a> {
    match line.strip_prefix(marker) {
        Some(payload) if !marker.is_empty() => Extracted::Packet(payload),
        _ => Extracted::Log(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_line_is_stripped() {
        assert_eq!(
            extract("#pkt#450000", DEFAULT_MARKER),
            Extracted::Packet("450000")
        );
    }

    #[test]
    fn test_empty_payload_is_still_a_packet() {
        assert_eq!(extract("#pkt#", DEFAULT_MARKER), Extracted::Packet(""));
    }

    #[test]
    fn test_log_lines_pass_through_unchanged() {
        for line in [
            "[WF] [KEY] [CFG] nwInfo",
            " #pkt#4500",
            "#PKT#4500",
            "prefix #pkt#4500",
            "#pkt",
        ] {
            assert_eq!(extract(line, DEFAULT_MARKER), Extracted::Log(line));
        }
    }

    #[test]
    fn test_custom_marker() {
        assert_eq!(extract("@frame:ab", "@frame:"), Extracted::Packet("ab"));
        assert_eq!(extract("#pkt#ab", "@frame:"), Extracted::Log("#pkt#ab"));
    }

    #[test]
    fn test_empty_marker_never_matches() {
        assert_eq!(extract("4500", ""), Extracted::Log("4500"));
    }
}
