// src/io/serial/utils.rs
//
// Conversions between our serial settings and the serialport crate's types.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity as SpParity, StopBits};

// ============================================================================
// Types
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Single-letter form used in `8N1` style summaries
    pub fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

pub fn to_serialport_parity(p: Parity) -> SpParity {
    match p {
        Parity::None => SpParity::None,
        Parity::Odd => SpParity::Odd,
        Parity::Even => SpParity::Even,
    }
}

/// Anything outside 5..=7 falls back to eight data bits
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

pub fn to_serialport_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// The device console never uses flow control
pub fn console_flow_control() -> FlowControl {
    FlowControl::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_default_and_letter() {
        assert_eq!(Parity::default(), Parity::None);
        assert_eq!(Parity::None.letter(), 'N');
        assert_eq!(Parity::Even.letter(), 'E');
    }

    #[test]
    fn test_parity_from_toml_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            parity: Parity,
        }
        let w: Wrapper = toml::from_str("parity = \"odd\"").unwrap();
        assert_eq!(w.parity, Parity::Odd);
    }

    #[test]
    fn test_data_and_stop_bits_fallbacks() {
        assert!(matches!(to_serialport_data_bits(7), DataBits::Seven));
        assert!(matches!(to_serialport_data_bits(9), DataBits::Eight));
        assert!(matches!(to_serialport_stop_bits(2), StopBits::Two));
        assert!(matches!(to_serialport_stop_bits(0), StopBits::One));
        assert!(matches!(to_serialport_parity(Parity::Odd), SpParity::Odd));
    }
}
