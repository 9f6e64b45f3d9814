//! MDDS: the Midas DAW/device signal envelope
//!
//! A plain data container for addressing and timestamping signals between the
//! DAW, the host and devices. No transport is implemented here.
//!
//! Byte layout of [`MddsEnvelope::to_bytes`] (integers little-endian):
//!
//! ```text
//! seconds:i32 | fraction:i32 | signal_type:u8 | source:[4] | destination:[4]
//!   | command_id:[4] | load_count:u8 | load_sizes:[n] | payload
//! ```

pub mod signal_map;

pub use signal_map::{MddsRoute, SignalMap};

use crate::error::{MidasError, Result};
use crate::midi::format_hex;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Four-byte source, destination, command or control identifier
pub type Id = [u8; 4];

/// All-zero destination: every receiver
pub const BROADCAST: Id = [0x00, 0x00, 0x00, 0x00];
/// Any DAW
pub const DAW_ALL: Id = [0x00, 0x00, 0x00, 0x00];
/// FL Studio
pub const DAW_FL_STUDIO: Id = [0x00, 0x00, 0x00, 0x01];
/// Any device
pub const DEVICE_ALL: Id = [0x00, 0x00, 0x00, 0x00];

/// Direction of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SignalType {
    DawToOs = 1,
    OsToDaw = 2,
    OsToDevice = 3,
    DeviceToOs = 4,
    DawToDevice = 5,
    DeviceToDaw = 6,
    DeviceToDevice = 7,
}

impl SignalType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            1 => SignalType::DawToOs,
            2 => SignalType::OsToDaw,
            3 => SignalType::OsToDevice,
            4 => SignalType::DeviceToOs,
            5 => SignalType::DawToDevice,
            6 => SignalType::DeviceToDaw,
            7 => SignalType::DeviceToDevice,
            other => return Err(MidasError::Validation(format!("unknown signal type {}", other))),
        })
    }
}

/// Monotonic time as whole seconds plus nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    pub seconds: i32,
    /// Fractional part scaled by 10^9
    pub fraction: i32,
}

impl Timestamp {
    /// Seconds saturate at `i32::MAX`
    pub fn from_duration(elapsed: Duration) -> Self {
        Self {
            seconds: i32::try_from(elapsed.as_secs()).unwrap_or(i32::MAX),
            fraction: elapsed.subsec_nanos() as i32,
        }
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.seconds.to_le_bytes());
        out[4..].copy_from_slice(&self.fraction.to_le_bytes());
        out
    }
}

/// Time source for envelope stamps
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// Time since the clock was created
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape of an envelope payload
///
/// A load count or load size of zero means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadDescription {
    pub load_count: u8,
    pub load_sizes: Vec<u8>,
}

impl PayloadDescription {
    pub fn new(load_count: u8, load_sizes: Vec<u8>) -> Self {
        Self { load_count, load_sizes }
    }

    /// Exact payload length, when every size is bounded
    pub fn fixed_len(&self) -> Option<usize> {
        if self.load_count == 0 || self.load_sizes.iter().any(|s| *s == 0) {
            return None;
        }
        let per_load: usize = self.load_sizes.iter().map(|s| *s as usize).sum();
        Some(per_load * self.load_count as usize)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.load_sizes.len());
        out.push(self.load_count);
        out.extend_from_slice(&self.load_sizes);
        out
    }
}

/// A catalogue entry: signal type, command id and payload shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MddsCommand {
    pub name: &'static str,
    pub signal_type: SignalType,
    pub command_id: Id,
    pub load_count: u8,
    pub load_sizes: &'static [u8],
}

/// Control id, channel, note, value 1, value 2
const CONTROL_LOAD: &[u8] = &[4, 1, 1, 1, 1];

impl MddsCommand {
    const fn new(
        name: &'static str,
        signal_type: SignalType,
        id: u8,
        load_count: u8,
        load_sizes: &'static [u8],
    ) -> Self {
        Self {
            name,
            signal_type,
            command_id: [0x00, 0x00, 0x00, id],
            load_count,
            load_sizes,
        }
    }

    pub const SCRIPT_INIT: Self = Self::new("script_init", SignalType::DawToOs, 0, 1, &[0]);
    pub const SCRIPT_EXIT: Self = Self::new("script_exit", SignalType::DawToOs, 1, 1, &[0]);
    /// Status, port, data1, data2
    pub const MIDI_MESSAGE: Self = Self::new("midi_message", SignalType::DeviceToDaw, 0, 1, &[4]);
    pub const SYSEX_MESSAGE: Self = Self::new("sysex_message", SignalType::DeviceToDaw, 1, 1, &[0]);
    pub const PRESSED: Self = Self::new("pressed", SignalType::DeviceToDevice, 0, 1, CONTROL_LOAD);
    pub const RELEASED: Self = Self::new("released", SignalType::DeviceToDevice, 1, 1, CONTROL_LOAD);
    pub const MOVED_X: Self = Self::new("moved_x", SignalType::DeviceToDevice, 2, 1, CONTROL_LOAD);
    pub const MOVED_Y: Self = Self::new("moved_y", SignalType::DeviceToDevice, 3, 1, CONTROL_LOAD);
    pub const MOVED_Z: Self = Self::new("moved_z", SignalType::DeviceToDevice, 4, 1, CONTROL_LOAD);
    pub const HELD_X: Self = Self::new("held_x", SignalType::DeviceToDevice, 5, 1, CONTROL_LOAD);
    pub const HELD_Y: Self = Self::new("held_y", SignalType::DeviceToDevice, 6, 1, CONTROL_LOAD);
    pub const HELD_Z: Self = Self::new("held_z", SignalType::DeviceToDevice, 7, 1, CONTROL_LOAD);
    /// Control id, channel, 14-bit value
    pub const BENT: Self = Self::new("bent", SignalType::DeviceToDevice, 8, 1, &[4, 1, 2]);

    pub const CATALOGUE: [Self; 13] = [
        Self::SCRIPT_INIT,
        Self::SCRIPT_EXIT,
        Self::MIDI_MESSAGE,
        Self::SYSEX_MESSAGE,
        Self::PRESSED,
        Self::RELEASED,
        Self::MOVED_X,
        Self::MOVED_Y,
        Self::MOVED_Z,
        Self::HELD_X,
        Self::HELD_Y,
        Self::HELD_Z,
        Self::BENT,
    ];

    pub fn by_name(name: &str) -> Option<Self> {
        Self::CATALOGUE.iter().find(|c| c.name == name).copied()
    }

    pub fn lookup(signal_type: SignalType, command_id: Id) -> Option<Self> {
        Self::CATALOGUE
            .iter()
            .find(|c| c.signal_type == signal_type && c.command_id == command_id)
            .copied()
    }

    pub fn payload_description(&self) -> PayloadDescription {
        PayloadDescription::new(self.load_count, self.load_sizes.to_vec())
    }

    /// Unstamped envelope with no payload
    pub fn envelope(&self, source: Id, destination: Id) -> MddsEnvelope {
        MddsEnvelope::new(
            self.signal_type,
            source,
            destination,
            self.command_id,
            self.payload_description(),
        )
    }
}

/// One addressed, timestamped signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MddsEnvelope {
    pub timestamp: Timestamp,
    pub signal_type: SignalType,
    pub source: Id,
    pub destination: Id,
    pub command_id: Id,
    pub payload_description: PayloadDescription,
    pub payload: Option<Vec<u8>>,
}

impl MddsEnvelope {
    pub fn new(
        signal_type: SignalType,
        source: Id,
        destination: Id,
        command_id: Id,
        payload_description: PayloadDescription,
    ) -> Self {
        Self {
            timestamp: Timestamp::default(),
            signal_type,
            source,
            destination,
            command_id,
            payload_description,
            payload: None,
        }
    }

    pub fn bind_payload(&mut self, payload: impl Into<Vec<u8>>) -> &mut Self {
        self.payload = Some(payload.into());
        self
    }

    /// Recompute both timestamp fields from a monotonic sample
    pub fn update_timestamp(&mut self, now: Duration) -> &mut Self {
        self.timestamp = Timestamp::from_duration(now);
        self
    }

    pub fn stamp(&mut self, clock: &MonotonicClock) -> &mut Self {
        self.update_timestamp(clock.now())
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination == BROADCAST
    }

    /// Check a bound payload against a fixed-size description
    pub fn check_payload(&self) -> Result<()> {
        let actual = self.payload.as_ref().map_or(0, Vec::len);
        match self.payload_description.fixed_len() {
            Some(expected) if expected != actual => Err(MidasError::Validation(format!(
                "payload of {} bytes does not fit a {} byte description",
                actual, expected
            ))),
            _ => Ok(()),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let description = self.payload_description.to_bytes();
        let payload = self.payload.as_deref().unwrap_or(&[]);
        let mut out = Vec::with_capacity(8 + 1 + 12 + description.len() + payload.len());
        out.extend_from_slice(&self.timestamp.to_bytes());
        out.push(self.signal_type.as_u8());
        out.extend_from_slice(&self.source);
        out.extend_from_slice(&self.destination);
        out.extend_from_slice(&self.command_id);
        out.extend_from_slice(&description);
        out.extend_from_slice(payload);
        out
    }
}

impl fmt::Display for MddsEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MDDS {:?} {}.{:09}s src:[{}] dst:[{}] cmd:[{}] payload:[{}]",
            self.signal_type,
            self.timestamp.seconds,
            self.timestamp.fraction,
            format_hex(&self.source),
            format_hex(&self.destination),
            format_hex(&self.command_id),
            format_hex(self.payload.as_deref().unwrap_or(&[]))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_split() {
        let ts = Timestamp::from_duration(Duration::new(12, 500_000_000));
        assert_eq!(ts, Timestamp { seconds: 12, fraction: 500_000_000 });
        assert_eq!(ts.to_bytes(), [12, 0, 0, 0, 0x00, 0x65, 0xCD, 0x1D]);

        let far = Timestamp::from_duration(Duration::from_secs(u64::MAX / 2));
        assert_eq!(far.seconds, i32::MAX);
    }

    #[test]
    fn test_signal_type_bytes() {
        assert_eq!(SignalType::DeviceToDevice.as_u8(), 7);
        assert_eq!(SignalType::from_u8(1).unwrap(), SignalType::DawToOs);
        assert!(SignalType::from_u8(0).is_err());
        assert!(SignalType::from_u8(8).is_err());
    }

    #[test]
    fn test_catalogue() {
        assert_eq!(MddsCommand::by_name("bent"), Some(MddsCommand::BENT));
        assert_eq!(MddsCommand::BENT.payload_description().to_bytes(), vec![1, 4, 1, 2]);
        assert_eq!(
            MddsCommand::lookup(SignalType::DeviceToDevice, [0, 0, 0, 1]),
            Some(MddsCommand::RELEASED)
        );
        assert_eq!(MddsCommand::SYSEX_MESSAGE.payload_description().fixed_len(), None);
        assert_eq!(MddsCommand::PRESSED.payload_description().fixed_len(), Some(8));
    }

    #[test]
    fn test_envelope_layout() {
        let mut envelope = MddsCommand::MIDI_MESSAGE.envelope(DAW_FL_STUDIO, BROADCAST);
        envelope
            .update_timestamp(Duration::new(1, 2))
            .bind_payload(vec![0x90, 0x00, 0x35, 0x64]);

        assert!(envelope.is_broadcast());
        envelope.check_payload().unwrap();
        assert_eq!(
            envelope.to_bytes(),
            vec![
                1, 0, 0, 0, 2, 0, 0, 0, // timestamp
                6, // device to daw
                0, 0, 0, 1, // source
                0, 0, 0, 0, // destination
                0, 0, 0, 0, // command
                1, 4, // description
                0x90, 0x00, 0x35, 0x64,
            ]
        );
    }

    #[test]
    fn test_check_payload() {
        let mut envelope = MddsCommand::PRESSED.envelope(DEVICE_ALL, DAW_FL_STUDIO);
        assert!(!envelope.is_broadcast());
        envelope.bind_payload(vec![0; 3]);
        assert!(envelope.check_payload().is_err());

        let mut sysex = MddsCommand::SYSEX_MESSAGE.envelope(DEVICE_ALL, BROADCAST);
        sysex.bind_payload(vec![0xF0, 0x01, 0x02, 0xF7]);
        assert!(sysex.check_payload().is_ok());
    }

    #[test]
    fn test_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let mut envelope = MddsCommand::SCRIPT_INIT.envelope(DAW_ALL, BROADCAST);
        envelope.stamp(&clock);
        let first = envelope.timestamp;
        std::thread::sleep(Duration::from_millis(2));
        envelope.stamp(&clock);
        let second = envelope.timestamp;
        assert!((second.seconds, second.fraction) > (first.seconds, first.fraction));
    }
}
