//! Channel and note offset resolution for MIDI statuses
//!
//! Some devices shift the status byte by the channel or the note instead of
//! using the low nibble the usual way. A [`MidiMessageBehavior`] describes the
//! shift so an incoming status can be folded back onto its base status.

use crate::error::{MidasError, Result};
use crate::midi::validate_byte;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channels scanned when the status is offset from its base by the channel
const BASE_CHANNEL_SCAN: i32 = 16;
/// Notes scanned when the status is offset from its base by the note
const BASE_NOTE_SCAN: i32 = 17;

/// Flags and static offsets describing a status encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiMessageBehavior {
    /// `status = status_in - channel`
    pub offset_by_channel: bool,
    /// Scan channels 0..16 for `status_in - i == base`
    pub base_offset_by_channel: bool,
    /// `status = status_in - note`
    pub offset_by_note: bool,
    /// Scan notes 0..17 for `status_in - i == base`
    pub base_offset_by_note: bool,
    /// Added to the resolved channel
    pub channel_offset: i32,
    /// Added to the resolved note
    pub note_offset: i32,
}

impl MidiMessageBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_by_channel(mut self) -> Self {
        self.offset_by_channel = true;
        self
    }

    pub fn base_offset_by_channel(mut self) -> Self {
        self.base_offset_by_channel = true;
        self
    }

    pub fn offset_by_note(mut self) -> Self {
        self.offset_by_note = true;
        self
    }

    pub fn base_offset_by_note(mut self) -> Self {
        self.base_offset_by_note = true;
        self
    }

    pub fn with_channel_offset(mut self, offset: i32) -> Self {
        self.channel_offset = offset;
        self
    }

    pub fn with_note_offset(mut self, offset: i32) -> Self {
        self.note_offset = offset;
        self
    }

    /// True when the channel is folded into the status byte
    pub fn encodes_channel(&self) -> bool {
        self.offset_by_channel || self.base_offset_by_channel
    }
}

/// Status, channel and note after offset resolution
///
/// Values may leave the byte range when an offset overshoots; such a result
/// simply fails to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub status: i32,
    pub channel: i32,
    pub note: i32,
}

/// A base status plus its encoding behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiMessage {
    pub status: u8,
    #[serde(default)]
    pub behavior: MidiMessageBehavior,
}

impl MidiMessage {
    pub const fn new(status: u8, behavior: MidiMessageBehavior) -> Self {
        Self { status, behavior }
    }

    /// A message whose status is used verbatim
    pub fn plain(status: u8) -> Self {
        Self::new(status, MidiMessageBehavior::default())
    }

    /// Resolve an incoming status against this message's behavior
    ///
    /// Steps run in a fixed order and each status step starts from
    /// `status_in`, so a later enabled step overrides an earlier one. Static
    /// offsets are applied last.
    pub fn get(&self, status_in: u8, channel: u8, note: u8) -> Resolved {
        let base = self.status as i32;
        let status_in = status_in as i32;
        let mut out = Resolved {
            status: status_in,
            channel: channel as i32,
            note: note as i32,
        };

        if self.behavior.offset_by_channel {
            out.status = status_in - channel as i32;
        }
        if self.behavior.base_offset_by_channel {
            if let Some(i) = (0..BASE_CHANNEL_SCAN).find(|i| status_in - i == base) {
                out.status = base;
                out.channel = i;
            }
        }
        if self.behavior.offset_by_note {
            out.status = status_in - note as i32;
        }
        if self.behavior.base_offset_by_note {
            if let Some(i) = (0..BASE_NOTE_SCAN).find(|i| status_in - i == base) {
                out.status = base;
                out.note = i;
            }
        }

        out.channel += self.behavior.channel_offset;
        out.note += self.behavior.note_offset;
        out
    }

    /// Does `status_in` resolve onto this message's base status?
    pub fn matches(&self, status_in: u8, channel: u8, note: u8) -> bool {
        self.get(status_in, channel, note).status == self.status as i32
    }

    /// Fix a concrete channel and note
    pub fn target(&self, channel: i64, note: i64) -> Result<TargetedMidiMessage> {
        Ok(TargetedMidiMessage {
            message: *self,
            channel: validate_byte("channel", channel)?,
            note: validate_byte("note", note)?,
        })
    }

    /// Fix a concrete channel, note and data value
    pub fn bind(&self, channel: i64, note: i64, value: i64) -> Result<BoundMidiMessage> {
        self.target(channel, note)?.bind(value)
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MidiMessage({:02X})", self.status)
    }
}

/// A message bound to one channel and note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetedMidiMessage {
    message: MidiMessage,
    channel: u8,
    note: u8,
}

impl TargetedMidiMessage {
    pub fn message(&self) -> &MidiMessage {
        &self.message
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    /// Resolve `status_in` as if it arrived on the targeted channel and note
    pub fn get(&self, status_in: u8) -> Resolved {
        self.message.get(status_in, self.channel, self.note)
    }

    /// Does the incoming event resolve to the base status at this address?
    ///
    /// Channel and note are compared after resolution, so static offsets
    /// apply to the incoming values, not to the target.
    pub fn matches(&self, status_in: u8, channel: u8, note: u8) -> bool {
        let resolved = self.message.get(status_in, channel, note);
        resolved.status == self.message.status as i32
            && resolved.channel == self.channel as i32
            && resolved.note == self.note as i32
    }

    pub fn bind(&self, value: i64) -> Result<BoundMidiMessage> {
        Ok(BoundMidiMessage {
            target: *self,
            value: validate_byte("value", value)?,
        })
    }
}

/// A targeted message with a fixed data value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundMidiMessage {
    target: TargetedMidiMessage,
    value: u8,
}

impl BoundMidiMessage {
    pub fn target(&self) -> &TargetedMidiMessage {
        &self.target
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn matches(&self, status_in: u8, channel: u8, note: u8, value: u8) -> bool {
        self.target.matches(status_in, channel, note) && value == self.value
    }

    /// Wire bytes `[status, note, value]`
    ///
    /// The channel is folded back into the status when the behavior encodes
    /// it there.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let message = self.target.message;
        let mut status = message.status;
        if message.behavior.encodes_channel() {
            status = status.checked_add(self.target.channel).ok_or_else(|| {
                MidasError::Validation(format!(
                    "status {:02X} cannot carry channel {}",
                    message.status, self.target.channel
                ))
            })?;
        }
        Ok(vec![status, self.target.note, self.value])
    }
}
