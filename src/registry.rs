//! Control and command registries
//!
//! Value types for abstract controls and their wire encodings, plus the two
//! bidirectional maps every application owns.

pub mod command_map;
pub mod control_map;

pub use command_map::{Command, CommandMap};
pub use control_map::ControlMap;

use crate::error::Result;
use crate::midi::validate_byte;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract identifier for a physical input, independent of its encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Control {
    pub group: u32,
    pub index: u32,
}

impl Control {
    pub const fn new(group: u32, index: u32) -> Self {
        Self { group, index }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Control({}, {})", self.group, self.index)
    }
}

/// Port and note identifying a control's MIDI encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WireAddress {
    port: u8,
    note: u8,
}

impl WireAddress {
    /// Both components must be MIDI data bytes
    pub fn new(port: i64, note: i64) -> Result<Self> {
        Ok(Self {
            port: validate_byte("port", port)?,
            note: validate_byte("note", note)?,
        })
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn note(&self) -> u8 {
        self.note
    }
}

impl fmt::Display for WireAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wire(port={}, note={})", self.port, self.note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MidasError;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality() {
        let mut seen = HashSet::new();
        seen.insert(Control::new(1, 2));
        assert!(seen.contains(&Control::new(1, 2)));
        assert_eq!(WireAddress::new(0, 53).unwrap(), WireAddress::new(0, 53).unwrap());
    }

    #[test]
    fn test_wire_address_validation() {
        assert_eq!(
            WireAddress::new(0, 128).unwrap_err(),
            MidasError::InvalidByte { field: "note", value: 128 }
        );
        assert!(WireAddress::new(-1, 0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Control::new(0, 3).to_string(), "Control(0, 3)");
        assert_eq!(WireAddress::new(1, 36).unwrap().to_string(), "Wire(port=1, note=36)");
    }
}
