//! Named message registries for one device
//!
//! Each direction keeps its MIDI and sysex messages in insertion order with
//! an inverse index, so a name resolves to a message and a message (or sysex
//! command code) resolves back to its name.

use super::{MidiMessage, SysexMessage};
use crate::error::{MidasError, Result};
use crate::midi;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which way a message travels relative to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Device to engine
    Input,
    /// Engine to device
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CodeTable {
    midi: Vec<(String, MidiMessage)>,
    midi_names: HashMap<MidiMessage, usize>,
    sysex: Vec<(String, SysexMessage)>,
    sysex_names: HashMap<Vec<u8>, usize>,
}

impl CodeTable {
    fn clear(&mut self) {
        self.midi.clear();
        self.midi_names.clear();
        self.sysex.clear();
        self.sysex_names.clear();
    }
}

/// Named MIDI and sysex messages, split by direction
#[derive(Debug, Clone, Default)]
pub struct MessageCodes {
    input: CodeTable,
    output: CodeTable,
}

impl MessageCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard channel-voice messages registered as inputs
    pub fn with_defaults() -> Self {
        let mut codes = Self::new();
        let defaults = [
            ("NOTE_ON", midi::NOTE_ON),
            ("NOTE_OFF", midi::NOTE_OFF),
            ("CONTROL_CHANGE", midi::CONTROL_CHANGE),
            ("PROGRAM_CHANGE", midi::PROGRAM_CHANGE),
            ("PITCH_BEND", midi::PITCH_BEND),
            ("NOTE_PRESSURE", midi::POLY_PRESSURE),
            ("CHANNEL_PRESSURE", midi::CHANNEL_PRESSURE),
        ];
        for (name, status) in defaults {
            let table = &mut codes.input;
            table.midi_names.insert(MidiMessage::plain(status), table.midi.len());
            table.midi.push((name.to_string(), MidiMessage::plain(status)));
        }
        codes
    }

    fn table(&self, direction: Direction) -> &CodeTable {
        match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
        }
    }

    fn table_mut(&mut self, direction: Direction) -> &mut CodeTable {
        match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        }
    }

    /// Register a MIDI message; name and message must both be new
    pub fn emplace_midi(&mut self, direction: Direction, name: &str, message: MidiMessage) -> Result<()> {
        let table = self.table_mut(direction);
        if table.midi.iter().any(|(n, _)| n == name) {
            return Err(MidasError::DuplicateKey(format!("{} message name '{}'", direction, name)));
        }
        if table.midi_names.contains_key(&message) {
            return Err(MidasError::DuplicateKey(format!("{} {} already registered", direction, message)));
        }
        table.midi_names.insert(message, table.midi.len());
        table.midi.push((name.to_string(), message));
        Ok(())
    }

    /// Register a sysex message; name and command code must both be new
    pub fn emplace_sysex(&mut self, direction: Direction, name: &str, message: SysexMessage) -> Result<()> {
        let table = self.table_mut(direction);
        if table.sysex.iter().any(|(n, _)| n == name) {
            return Err(MidasError::DuplicateKey(format!("{} sysex name '{}'", direction, name)));
        }
        if table.sysex_names.contains_key(message.command()) {
            return Err(MidasError::DuplicateKey(format!(
                "{} sysex command [{}] already registered",
                direction,
                midi::format_hex(message.command())
            )));
        }
        table.sysex_names.insert(message.command().to_vec(), table.sysex.len());
        table.sysex.push((name.to_string(), message));
        Ok(())
    }

    pub fn midi(&self, direction: Direction, name: &str) -> Option<&MidiMessage> {
        self.table(direction).midi.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn sysex(&self, direction: Direction, name: &str) -> Option<&SysexMessage> {
        self.table(direction).sysex.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn midi_name(&self, direction: Direction, message: &MidiMessage) -> Option<&str> {
        let table = self.table(direction);
        table.midi_names.get(message).map(|&i| table.midi[i].0.as_str())
    }

    pub fn sysex_name(&self, direction: Direction, command: &[u8]) -> Option<&str> {
        let table = self.table(direction);
        table.sysex_names.get(command).map(|&i| table.sysex[i].0.as_str())
    }

    pub fn midi_messages(&self, direction: Direction) -> impl Iterator<Item = (&str, &MidiMessage)> {
        self.table(direction).midi.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn sysex_messages(&self, direction: Direction) -> impl Iterator<Item = (&str, &SysexMessage)> {
        self.table(direction).sysex.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// First input MIDI message whose behavior resolves `status`
    pub fn match_midi(&self, status: u8, channel: u8, note: u8) -> Option<(&str, &MidiMessage)> {
        self.midi_messages(Direction::Input)
            .find(|(_, message)| message.matches(status, channel, note))
    }

    /// First input sysex message whose device id and command prefix `frame`
    pub fn match_sysex(&self, frame: &[u8]) -> Option<(&str, &SysexMessage)> {
        self.sysex_messages(Direction::Input)
            .find(|(_, message)| message.is_frame_of(frame))
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.input.midi.is_empty()
            && self.input.sysex.is_empty()
            && self.output.midi.is_empty()
            && self.output.sysex.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MidiMessageBehavior, SysexParameter};

    fn shift() -> SysexMessage {
        SysexMessage::new(
            vec![0x00, 0x20, 0x6B, 0x7F, 0x42],
            vec![0x02, 0x00, 0x00, 0x2E],
            [("PRESSED_RELEASED", SysexParameter::one_of(&[0x7F, 0x00]))],
        )
    }

    #[test]
    fn test_defaults() {
        let codes = MessageCodes::with_defaults();
        assert_eq!(codes.midi(Direction::Input, "NOTE_ON"), Some(&MidiMessage::plain(0x90)));
        assert_eq!(
            codes.midi_name(Direction::Input, &MidiMessage::plain(0xD0)),
            Some("CHANNEL_PRESSURE")
        );
        assert!(codes.midi(Direction::Output, "NOTE_ON").is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut codes = MessageCodes::with_defaults();
        assert!(codes
            .emplace_midi(Direction::Input, "NOTE_ON", MidiMessage::plain(0x91))
            .is_err());
        assert!(codes
            .emplace_midi(Direction::Input, "OTHER", MidiMessage::plain(0x90))
            .is_err());
        // Same message with another behavior is a different message
        codes
            .emplace_midi(
                Direction::Input,
                "NOTE_ON_ANY_CHANNEL",
                MidiMessage::new(0x90, MidiMessageBehavior::new().base_offset_by_channel()),
            )
            .unwrap();

        codes.emplace_sysex(Direction::Input, "SHIFT", shift()).unwrap();
        assert!(codes.emplace_sysex(Direction::Input, "SHIFT_AGAIN", shift()).is_err());
        codes.emplace_sysex(Direction::Output, "SHIFT", shift()).unwrap();
    }

    #[test]
    fn test_match_midi_scans_inputs_in_order() {
        let mut codes = MessageCodes::new();
        codes
            .emplace_midi(
                Direction::Input,
                "PAD",
                MidiMessage::new(0x90, MidiMessageBehavior::new().base_offset_by_channel()),
            )
            .unwrap();
        codes.emplace_midi(Direction::Input, "KNOB", MidiMessage::plain(0xB0)).unwrap();

        assert_eq!(codes.match_midi(0x9F, 0, 36).map(|(n, _)| n), Some("PAD"));
        assert_eq!(codes.match_midi(0xB0, 0, 1).map(|(n, _)| n), Some("KNOB"));
        assert!(codes.match_midi(0xB1, 1, 1).is_none());
    }

    #[test]
    fn test_match_sysex() {
        let mut codes = MessageCodes::new();
        codes.emplace_sysex(Direction::Input, "SHIFT", shift()).unwrap();

        let frame = [0xF0, 0x00, 0x20, 0x6B, 0x7F, 0x42, 0x02, 0x00, 0x00, 0x2E, 0x7F, 0xF7];
        let (name, message) = codes.match_sysex(&frame).unwrap();
        assert_eq!(name, "SHIFT");
        assert_eq!(codes.sysex_name(Direction::Input, message.command()), Some("SHIFT"));

        let other = [0xF0, 0x00, 0x20, 0x6B, 0x7F, 0x42, 0x1B, 0x02, 0xF7];
        assert!(codes.match_sysex(&other).is_none());
    }

    #[test]
    fn test_clear() {
        let mut codes = MessageCodes::with_defaults();
        codes.clear();
        assert!(codes.is_empty());
    }
}
