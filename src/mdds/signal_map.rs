//! Wire event to MDDS signal lookup
//!
//! Short messages are keyed on `(status, port, note, value)`, where any field
//! but the status may be left open. Sysex frames are keyed on their exact
//! bytes.

use super::{Id, MddsCommand, MddsEnvelope, PayloadDescription, SignalType};
use crate::error::{MidasError, Result};
use crate::key::{CompositeKey, Key, PatternTable};
use crate::midi::{check_sysex_frame, format_hex, WireEvent};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// What a matched wire event becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MddsRoute {
    pub signal_type: SignalType,
    pub command_id: Id,
    pub control_id: Id,
}

impl MddsRoute {
    pub fn new(command: &MddsCommand, control_id: Id) -> Self {
        Self {
            signal_type: command.signal_type,
            command_id: command.command_id,
            control_id,
        }
    }

    fn payload_description(&self) -> PayloadDescription {
        MddsCommand::lookup(self.signal_type, self.command_id)
            .map(|c| c.payload_description())
            .unwrap_or_else(|| PayloadDescription::new(0, Vec::new()))
    }

    fn is_bend(&self) -> bool {
        self.signal_type == SignalType::DeviceToDevice && self.command_id == MddsCommand::BENT.command_id
    }

    /// Length of the payload built from a short message
    fn short_payload_len(&self) -> usize {
        match self.signal_type {
            SignalType::DeviceToDevice if self.is_bend() => 7,
            SignalType::DeviceToDevice => 8,
            _ => 4,
        }
    }

    fn short_payload(&self, event: &WireEvent) -> Vec<u8> {
        let channel = event.channel().unwrap_or(0);
        match self.signal_type {
            SignalType::DeviceToDevice if self.is_bend() => {
                let bend = ((event.data2 as u16) << 7) | event.data1 as u16;
                let mut load = self.control_id.to_vec();
                load.push(channel);
                load.extend_from_slice(&bend.to_le_bytes());
                load
            }
            SignalType::DeviceToDevice => {
                let mut load = self.control_id.to_vec();
                load.extend_from_slice(&[channel, event.data1, event.data2, 0]);
                load
            }
            _ => vec![event.status, event.port, event.data1, event.data2],
        }
    }
}

/// Lookup from device traffic to MDDS routes
#[derive(Debug, Clone)]
pub struct SignalMap {
    midi: PatternTable<MddsRoute>,
    sysex: HashMap<Vec<u8>, MddsRoute>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self {
            midi: PatternTable::new(4),
            sysex: HashMap::new(),
        }
    }

    /// Map a short message pattern; `None` fields match any value
    ///
    /// Mapping the same pattern twice is an error, and so is a route whose
    /// fixed payload size a short message cannot fill.
    pub fn map_midi(
        &mut self,
        status: u8,
        port: Option<u8>,
        note: Option<u8>,
        value: Option<u8>,
        route: MddsRoute,
    ) -> Result<()> {
        if let Some(expected) = route.payload_description().fixed_len() {
            if expected != route.short_payload_len() {
                return Err(MidasError::Validation(format!(
                    "route {:?} [{}] expects {} payload bytes, short messages carry {}",
                    route.signal_type,
                    format_hex(&route.command_id),
                    expected,
                    route.short_payload_len()
                )));
            }
        }
        let key = CompositeKey::from([
            Key::from(status as i64),
            Key::from(port.map(i64::from)),
            Key::from(note.map(i64::from)),
            Key::from(value.map(i64::from)),
        ]);
        self.midi.insert(key, route)
    }

    /// Map an exact sysex frame, replacing any previous route for it
    ///
    /// The frame becomes the payload, so the route's payload must be unbounded.
    pub fn map_sysex(&mut self, frame: &[u8], route: MddsRoute) -> Result<()> {
        check_sysex_frame(frame)?;
        if let Some(expected) = route.payload_description().fixed_len() {
            return Err(MidasError::Validation(format!(
                "route {:?} [{}] has a fixed {} byte payload and cannot carry sysex [{}]",
                route.signal_type,
                format_hex(&route.command_id),
                expected,
                format_hex(frame)
            )));
        }
        if self.sysex.insert(frame.to_vec(), route).is_some() {
            warn!("⚠️  Sysex [{}] remapped", format_hex(frame));
        }
        Ok(())
    }

    pub fn route_midi(&self, status: u8, port: u8, note: u8, value: u8) -> Option<&MddsRoute> {
        self.midi
            .get(&[status as i64, port as i64, note as i64, value as i64])
    }

    pub fn route_sysex(&self, frame: &[u8]) -> Option<&MddsRoute> {
        self.sysex.get(frame)
    }

    pub fn route(&self, event: &WireEvent) -> Option<&MddsRoute> {
        match &event.sysex {
            Some(frame) => self.route_sysex(frame),
            None => self.route_midi(event.status, event.port, event.data1, event.data2),
        }
    }

    /// Wrap a matched event in a stamped envelope
    ///
    /// Control signals carry `control_id, channel, note, value, 0`, bend
    /// signals `control_id, channel` and the 14-bit value little-endian, raw
    /// MIDI signals `status, port, data1, data2` and sysex signals the frame.
    /// Payload sizes were checked when the route was mapped.
    pub fn translate(&self, event: &WireEvent, source: Id, destination: Id, now: Duration) -> Option<MddsEnvelope> {
        let route = self.route(event)?;

        let payload = match &event.sysex {
            Some(frame) => frame.clone(),
            None => route.short_payload(event),
        };

        let mut envelope = MddsEnvelope::new(
            route.signal_type,
            source,
            destination,
            route.command_id,
            route.payload_description(),
        );
        envelope.update_timestamp(now).bind_payload(payload);
        debug!("{} -> {}", event, envelope);
        Some(envelope)
    }

    pub fn midi_len(&self) -> usize {
        self.midi.len()
    }

    pub fn sysex_len(&self) -> usize {
        self.sysex.len()
    }
}

impl Default for SignalMap {
    fn default() -> Self {
        Self::new()
    }
}
