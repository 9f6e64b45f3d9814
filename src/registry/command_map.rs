//! Command <-> status registry with channel-offset matching

use crate::error::{MidasError, Result};
use crate::midi::{self, is_channel_voice};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Event kind carried by a status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    NoteOn,
    NoteOff,
    ControlChange,
    PolyPressure,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::NoteOn,
        Command::NoteOff,
        Command::ControlChange,
        Command::PolyPressure,
        Command::ProgramChange,
        Command::ChannelPressure,
        Command::PitchBend,
    ];

    /// Channel-1 status defined by the MIDI standard
    pub fn standard_status(self) -> u8 {
        match self {
            Command::NoteOn => midi::NOTE_ON,
            Command::NoteOff => midi::NOTE_OFF,
            Command::ControlChange => midi::CONTROL_CHANGE,
            Command::PolyPressure => midi::POLY_PRESSURE,
            Command::ProgramChange => midi::PROGRAM_CHANGE,
            Command::ChannelPressure => midi::CHANNEL_PRESSURE,
            Command::PitchBend => midi::PITCH_BEND,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::NoteOn => "NOTE_ON",
            Command::NoteOff => "NOTE_OFF",
            Command::ControlChange => "CONTROL_CHANGE",
            Command::PolyPressure => "NOTE_PRESSURE",
            Command::ProgramChange => "PROGRAM_CHANGE",
            Command::ChannelPressure => "CHANNEL_PRESSURE",
            Command::PitchBend => "PITCH_BEND",
        };
        f.write_str(name)
    }
}

/// Bidirectional map between commands and their base status bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMap {
    order: Vec<Command>,
    by_command: HashMap<Command, u8>,
    by_status: HashMap<u8, Command>,
}

impl CommandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// All seven channel-voice commands at their standard statuses
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        for command in Command::ALL {
            map.push(command, command.standard_status());
        }
        map
    }

    /// Register `command` at `status`; fails if either side is bound
    pub fn emplace(&mut self, command: Command, status: u8) -> Result<()> {
        if let Some(existing) = self.by_command.get(&command) {
            return Err(MidasError::DuplicateKey(format!(
                "{} is already bound to status {:02X}",
                command, existing
            )));
        }
        if let Some(existing) = self.by_status.get(&status) {
            return Err(MidasError::DuplicateKey(format!(
                "status {:02X} is already bound to {}",
                status, existing
            )));
        }
        self.push(command, status);
        Ok(())
    }

    pub fn get_status(&self, command: Command) -> Result<u8> {
        self.by_command
            .get(&command)
            .copied()
            .ok_or_else(|| MidasError::NotFound(format!("{} has no status", command)))
    }

    /// Command registered at exactly `status`
    pub fn get_command(&self, status: u8) -> Option<Command> {
        self.by_status.get(&status).copied()
    }

    /// Does `raw_status` encode `command` on `channel`?
    ///
    /// Tests `raw_status - channel == base`, or `raw_status + channel == base`
    /// when `reversed`. Unregistered commands never match.
    pub fn is_command_offset_by_channel(
        &self,
        command: Command,
        raw_status: u8,
        channel: u8,
        reversed: bool,
    ) -> bool {
        let Some(&base) = self.by_command.get(&command) else {
            return false;
        };
        let shifted = if reversed {
            raw_status as i16 + channel as i16
        } else {
            raw_status as i16 - channel as i16
        };
        shifted == base as i16
    }

    /// Resolve a raw status to its command and channel
    ///
    /// An exact registration wins and reports channel 0. Otherwise a
    /// channel-voice status is resolved through its low nibble.
    pub fn classify(&self, raw_status: u8) -> Option<(Command, u8)> {
        if let Some(command) = self.get_command(raw_status) {
            return Some((command, 0));
        }
        if !is_channel_voice(raw_status) {
            return None;
        }
        let channel = raw_status & 0x0F;
        let command = self.get_command(raw_status - channel)?;
        self.is_command_offset_by_channel(command, raw_status, channel, false)
            .then_some((command, channel))
    }

    /// Register commands positionally
    ///
    /// Commands past the end of `statuses` stay registered without a status,
    /// as [`ControlMap::generate`](super::ControlMap::generate) does for
    /// controls. A repeated command or status fails the whole call.
    pub fn generate(&mut self, commands: &[Command], statuses: &[u8]) -> Result<()> {
        let mut seen_commands = HashSet::new();
        for command in commands {
            if self.order.contains(command) || !seen_commands.insert(*command) {
                return Err(MidasError::DuplicateKey(format!("{} is already registered", command)));
            }
        }
        let mut seen_statuses = HashSet::new();
        for status in statuses.iter().take(commands.len()) {
            if self.by_status.contains_key(status) || !seen_statuses.insert(*status) {
                return Err(MidasError::DuplicateKey(format!(
                    "status {:02X} is already registered",
                    status
                )));
            }
        }

        for (i, command) in commands.iter().enumerate() {
            match statuses.get(i) {
                Some(status) => self.push(*command, *status),
                None => self.order.push(*command),
            }
        }
        Ok(())
    }

    /// Clear and generate; the map is untouched if generation would fail
    pub fn regenerate(&mut self, commands: &[Command], statuses: &[u8]) -> Result<()> {
        let mut fresh = Self::new();
        fresh.generate(commands, statuses)?;
        *self = fresh;
        Ok(())
    }

    /// Reassign statuses to every registered command in registration order
    ///
    /// Commands past the end of `statuses` are kept without a status, so a
    /// later retarget can bind them again.
    pub fn retarget(&mut self, statuses: &[u8]) -> Result<()> {
        let commands: Vec<Command> = self.order.clone();
        self.regenerate(&commands, statuses)
    }

    /// Commands that currently have a status, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (Command, u8)> + '_ {
        self.order
            .iter()
            .filter_map(|c| self.by_command.get(c).map(|status| (*c, *status)))
    }

    /// Registered commands, with or without a status
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// True when `command` is registered, with or without a status
    pub fn contains(&self, command: Command) -> bool {
        self.order.contains(&command)
    }

    fn push(&mut self, command: Command, status: u8) {
        if !self.order.contains(&command) {
            self.order.push(command);
        }
        self.by_command.insert(command, status);
        self.by_status.insert(status, command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_emplace_duplicates() {
        let mut map = CommandMap::new();
        map.emplace(Command::NoteOn, 0x90).unwrap();
        assert!(map.emplace(Command::NoteOn, 0x91).is_err());
        assert!(map.emplace(Command::NoteOff, 0x90).is_err());
        assert_eq!(map.get_status(Command::NoteOn).unwrap(), 0x90);
        assert!(matches!(map.get_status(Command::PitchBend), Err(MidasError::NotFound(_))));
    }

    #[test]
    fn test_reversed_offset() {
        let mut map = CommandMap::new();
        map.emplace(Command::ControlChange, 0xB5).unwrap();
        assert!(map.is_command_offset_by_channel(Command::ControlChange, 0xB0, 5, true));
        assert!(!map.is_command_offset_by_channel(Command::ControlChange, 0xB0, 5, false));
        assert!(!map.is_command_offset_by_channel(Command::NoteOn, 0x90, 0, false));
    }

    #[test]
    fn test_classify() {
        let map = CommandMap::with_defaults();
        assert_eq!(map.classify(0x90), Some((Command::NoteOn, 0)));
        assert_eq!(map.classify(0x9A), Some((Command::NoteOn, 10)));
        assert_eq!(map.classify(0xB3), Some((Command::ControlChange, 3)));
        assert_eq!(map.classify(0xF8), None);

        let mut partial = CommandMap::new();
        partial.emplace(Command::NoteOn, 0x90).unwrap();
        assert_eq!(partial.classify(0xB0), None);
    }

    #[test]
    fn test_retarget_keeps_order() {
        let mut map = CommandMap::new();
        map.generate(&[Command::NoteOn, Command::ControlChange], &[0x90, 0xB0]).unwrap();
        map.retarget(&[0x91]).unwrap();

        assert_eq!(map.get_status(Command::NoteOn).unwrap(), 0x91);
        assert!(map.get_status(Command::ControlChange).is_err());
        assert!(map.contains(Command::ControlChange));
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(Command::NoteOn, 0x91)]);

        // The unbound command picks its status back up
        map.retarget(&[0x90, 0xB1]).unwrap();
        assert_eq!(map.get_status(Command::ControlChange).unwrap(), 0xB1);
        assert_eq!(map.classify(0xB1), Some((Command::ControlChange, 0)));
    }

    #[test]
    fn test_emplace_binds_unbound_command() {
        let mut map = CommandMap::new();
        map.generate(&[Command::NoteOn, Command::PitchBend], &[0x90]).unwrap();
        map.emplace(Command::PitchBend, 0xE0).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![(Command::NoteOn, 0x90), (Command::PitchBend, 0xE0)]
        );
    }

    #[test]
    fn test_generate_rejects_repeats() {
        let mut map = CommandMap::new();
        assert!(map.generate(&[Command::NoteOn, Command::NoteOn], &[0x90]).is_err());
        assert!(map.generate(&[Command::NoteOn, Command::NoteOff], &[0x90, 0x90]).is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn test_regenerate_is_idempotent() {
        let commands = [Command::NoteOn, Command::NoteOff, Command::ControlChange];
        let statuses = [0x90, 0x80, 0xB0];
        let mut map = CommandMap::with_defaults();
        map.regenerate(&commands, &statuses).unwrap();
        let first = map.clone();
        map.regenerate(&commands, &statuses).unwrap();
        assert_eq!(map, first);
        assert_eq!(map.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_every_channel_offsets_registered_command(
            index in 0usize..Command::ALL.len(),
            channel in 0u8..16,
        ) {
            let map = CommandMap::with_defaults();
            let command = Command::ALL[index];
            let base = map.get_status(command).unwrap();
            prop_assert!(map.is_command_offset_by_channel(command, base + channel, channel, false));
            prop_assert_eq!(map.classify(base + channel), Some((command, channel)));
        }
    }
}
