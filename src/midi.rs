//! MIDI byte utilities and the wire event boundary type
//!
//! Everything entering the engine is converted once into a [`WireEvent`] with
//! range-checked fields. Nothing past this boundary re-validates raw bytes.

use crate::error::{MidasError, Result};
use std::fmt;

/// Note Off base status
pub const NOTE_OFF: u8 = 0x80;
/// Note On base status
pub const NOTE_ON: u8 = 0x90;
/// Polyphonic key pressure base status
pub const POLY_PRESSURE: u8 = 0xA0;
/// Control Change base status
pub const CONTROL_CHANGE: u8 = 0xB0;
/// Program Change base status
pub const PROGRAM_CHANGE: u8 = 0xC0;
/// Channel pressure base status
pub const CHANNEL_PRESSURE: u8 = 0xD0;
/// Pitch bend base status
pub const PITCH_BEND: u8 = 0xE0;
/// Start of a system exclusive frame
pub const SYSEX_START: u8 = 0xF0;
/// End of a system exclusive frame
pub const SYSEX_END: u8 = 0xF7;

/// Highest value a MIDI data byte may carry
pub const DATA_MAX: u8 = 0x7F;

/// Check that `value` fits in a MIDI data byte
pub fn validate_byte(field: &'static str, value: i64) -> Result<u8> {
    if (0..=DATA_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(MidasError::InvalidByte { field, value })
    }
}

/// True for channel-voice statuses (0x80..=0xEF)
pub fn is_channel_voice(status: u8) -> bool {
    (NOTE_OFF..SYSEX_START).contains(&status)
}

/// One input event as delivered by the device or host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    pub status: u8,
    pub port: u8,
    pub data1: u8,
    pub data2: u8,
    pub sysex: Option<Vec<u8>>,
}

impl WireEvent {
    /// Build a short message, validating the data fields
    pub fn new(status: u8, port: u8, data1: u8, data2: u8) -> Result<Self> {
        Ok(Self {
            status,
            port: validate_byte("port", port as i64)?,
            data1: validate_byte("data1", data1 as i64)?,
            data2: validate_byte("data2", data2 as i64)?,
            sysex: None,
        })
    }

    /// Build a sysex event; the frame must be `F0 .. F7`
    pub fn with_sysex(port: u8, frame: Vec<u8>) -> Result<Self> {
        check_sysex_frame(&frame)?;
        Ok(Self {
            status: SYSEX_START,
            port: validate_byte("port", port as i64)?,
            data1: 0,
            data2: 0,
            sysex: Some(frame),
        })
    }

    /// Parse raw bytes received on `port`
    ///
    /// Missing data bytes read as zero. Running status (a data byte first) is
    /// rejected since the engine keeps no per-port state.
    pub fn from_raw(port: u8, data: &[u8]) -> Result<Self> {
        let Some(&status) = data.first() else {
            return Err(MidasError::Validation("empty MIDI message".to_string()));
        };

        if status == SYSEX_START {
            return Self::with_sysex(port, data.to_vec());
        }
        if status < NOTE_OFF {
            return Err(MidasError::Validation(format!(
                "running status not supported (first byte {:02X})",
                status
            )));
        }

        let data1 = data.get(1).copied().unwrap_or(0);
        let data2 = data.get(2).copied().unwrap_or(0);
        Self::new(status, port, data1, data2)
    }

    /// Channel encoded in the low nibble, for channel-voice statuses
    pub fn channel(&self) -> Option<u8> {
        is_channel_voice(self.status).then_some(self.status & 0x0F)
    }

    /// Status with the channel nibble cleared
    pub fn kind(&self) -> u8 {
        if is_channel_voice(self.status) {
            self.status & 0xF0
        } else {
            self.status
        }
    }

    pub fn is_sysex(&self) -> bool {
        self.sysex.is_some()
    }

    /// Raw bytes as they would appear on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.sysex {
            Some(frame) => frame.clone(),
            None => vec![self.status, self.data1, self.data2],
        }
    }
}

impl fmt::Display for WireEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(frame) = &self.sysex {
            return write!(f, "SysEx port:{} {} bytes [{}]", self.port, frame.len(), format_hex(frame));
        }
        let name = match self.kind() {
            NOTE_OFF => "NoteOff",
            NOTE_ON => "NoteOn",
            POLY_PRESSURE => "PolyPressure",
            CONTROL_CHANGE => "CC",
            PROGRAM_CHANGE => "ProgramChange",
            CHANNEL_PRESSURE => "ChannelPressure",
            PITCH_BEND => "PitchBend",
            _ => "System",
        };
        match self.channel() {
            Some(ch) => write!(
                f,
                "{} ch:{} port:{} d1:{} d2:{}",
                name,
                ch + 1,
                self.port,
                self.data1,
                self.data2
            ),
            None => write!(f, "{} {:02X} port:{}", name, self.status, self.port),
        }
    }
}

/// Reject anything that is not a complete `F0 .. F7` frame
pub fn check_sysex_frame(frame: &[u8]) -> Result<()> {
    match (frame.first(), frame.last()) {
        (Some(&SYSEX_START), Some(&SYSEX_END)) if frame.len() >= 2 => Ok(()),
        _ => Err(MidasError::Validation(format!(
            "sysex frame must start with F0 and end with F7: [{}]",
            format_hex(frame)
        ))),
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse "90 35 64", "90:35:64" or "903564" into bytes
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    hex::decode(&compact).map_err(|e| MidasError::Validation(format!("invalid hex '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let event = WireEvent::from_raw(0, &[0x90, 60, 100]).unwrap();
        assert_eq!(event.status, 0x90);
        assert_eq!(event.data1, 60);
        assert_eq!(event.data2, 100);
        assert_eq!(event.channel(), Some(0));
    }

    #[test]
    fn test_control_change_channel() {
        let event = WireEvent::from_raw(1, &[0xB2, 7, 100]).unwrap();
        assert_eq!(event.channel(), Some(2));
        assert_eq!(event.kind(), CONTROL_CHANGE);
        assert_eq!(event.port, 1);
    }

    #[test]
    fn test_short_message_pads_with_zero() {
        let event = WireEvent::from_raw(0, &[0xC3, 5]).unwrap();
        assert_eq!(event.data1, 5);
        assert_eq!(event.data2, 0);
    }

    #[test]
    fn test_out_of_range_data_rejected() {
        let err = WireEvent::from_raw(0, &[0x90, 0x80, 1]).unwrap_err();
        assert_eq!(err, MidasError::InvalidByte { field: "data1", value: 0x80 });
        assert!(WireEvent::new(0x90, 200, 1, 1).is_err());
    }

    #[test]
    fn test_running_status_and_empty_rejected() {
        assert!(WireEvent::from_raw(0, &[0x35, 0x64]).is_err());
        assert!(WireEvent::from_raw(0, &[]).is_err());
    }

    #[test]
    fn test_sysex_frame() {
        let frame = vec![0xF0, 0x00, 0x20, 0x6B, 0xF7];
        let event = WireEvent::from_raw(0, &frame).unwrap();
        assert!(event.is_sysex());
        assert_eq!(event.channel(), None);
        assert_eq!(event.to_bytes(), frame);

        assert!(WireEvent::from_raw(0, &[0xF0, 0x00, 0x20]).is_err());
    }

    #[test]
    fn test_validate_byte_bounds() {
        assert_eq!(validate_byte("note", 0).unwrap(), 0);
        assert_eq!(validate_byte("note", 127).unwrap(), 127);
        assert!(validate_byte("note", 128).is_err());
        assert!(validate_byte("note", -1).is_err());
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(format_hex(&[0x90, 0x35, 0x64]), "90 35 64");
        assert_eq!(parse_hex("90 35 64").unwrap(), vec![0x90, 0x35, 0x64]);
        assert_eq!(parse_hex("F0:00:F7").unwrap(), vec![0xF0, 0x00, 0xF7]);
        assert!(parse_hex("9").is_err());
    }

    #[test]
    fn test_display() {
        let event = WireEvent::new(0x91, 0, 53, 100).unwrap();
        assert_eq!(event.to_string(), "NoteOn ch:2 port:0 d1:53 d2:100");
    }
}
