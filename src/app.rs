//! Applications and event dispatch
//!
//! An application owns its three registries and reacts to semantic events.
//! [`dispatch`] turns a [`WireEvent`] into those events.

pub mod callback;
pub mod dispatch;

pub use callback::CallbackApplication;
pub use dispatch::dispatch;

use crate::error::Result;
use crate::message::{BoundSysexMessage, MessageCodes};
use crate::midi::WireEvent;
use crate::registry::{Command, CommandMap, Control, ControlMap};
use serde::Serialize;
use std::fmt;

/// The registries one application uses to decode wire events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registries {
    /// Note on/off sources
    pub button_map: ControlMap,
    /// Control change sources
    pub controller_map: ControlMap,
    pub command_map: CommandMap,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty control maps and the standard command statuses
    pub fn with_default_commands() -> Self {
        Self {
            command_map: CommandMap::with_defaults(),
            ..Self::default()
        }
    }
}

/// A control reported an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MidasEvent {
    pub control: Control,
    pub command: Command,
    pub value: u8,
    pub channel: u8,
}

impl fmt::Display for MidasEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} value:{} ch:{}", self.control, self.command, self.value, self.channel + 1)
    }
}

/// Feedback for a control, resolved back to the wire by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MidasOutputEvent {
    pub control: Control,
    pub command: Command,
    pub value: u8,
}

impl MidasOutputEvent {
    pub fn new(control: Control, command: Command, value: u8) -> Self {
        Self { control, command, value }
    }
}

/// Something a handler wants sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    /// Routed through the owning application's registries
    Midas(MidasOutputEvent),
    /// Sent verbatim
    Short { status: u8, channel: u8, data1: u8, data2: u8 },
    Sysex { frame: Vec<u8> },
}

/// Messages collected from handlers during one dispatch
#[derive(Debug, Default)]
pub struct Outbox {
    items: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: MidasOutputEvent) {
        self.items.push(Outbound::Midas(event));
    }

    pub fn send(&mut self, status: u8, channel: u8, data1: u8, data2: u8) {
        self.items.push(Outbound::Short { status, channel, data1, data2 });
    }

    pub fn send_sysex(&mut self, frame: Vec<u8>) {
        self.items.push(Outbound::Sysex { frame });
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Outbound> {
        self.items.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outbound> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A handler hosted on a page
///
/// Only the registries and the event handler are required. Lifecycle hooks
/// default to no-ops, except [`Application::on_activate`] which runs
/// [`Application::setup_mappings`].
pub trait Application {
    fn name(&self) -> &str;

    fn registries(&self) -> &Registries;

    fn registries_mut(&mut self) -> &mut Registries;

    /// Named device messages used to decode sysex input
    fn message_codes(&self) -> Option<&MessageCodes> {
        None
    }

    /// Register mappings that depend on runtime state
    fn setup_mappings(&mut self) -> Result<()> {
        Ok(())
    }

    /// Added to `page` at position `index`
    fn on_attach(&mut self, _page: &str, _index: usize) {}

    fn on_activate(&mut self) -> Result<()> {
        self.setup_mappings()
    }

    fn on_deactivate(&mut self) {}

    /// The page holding this application became active
    fn on_page_activate(&mut self) {}

    /// Periodic host tick
    fn on_midas_update(&mut self) {}

    /// Every wire event, before classification
    fn on_midas_process(&mut self, _event: &WireEvent) {}

    /// One decoded control event
    fn on_midas_event(&mut self, event: &MidasEvent, outbox: &mut Outbox);

    /// A sysex frame matched one of the input sysex codes
    fn on_sysex_event(&mut self, _name: &str, _message: &BoundSysexMessage, _outbox: &mut Outbox) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_keeps_order() {
        let mut outbox = Outbox::new();
        outbox.emit(MidasOutputEvent::new(Control::new(0, 1), Command::NoteOn, 127));
        outbox.send(0xB0, 0, 7, 1);
        outbox.send_sysex(vec![0xF0, 0xF7]);

        let items: Vec<Outbound> = outbox.drain().collect();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Outbound::Midas(_)));
        assert!(matches!(items[2], Outbound::Sysex { .. }));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_event_display() {
        let event = MidasEvent {
            control: Control::new(0, 0),
            command: Command::NoteOn,
            value: 100,
            channel: 0,
        };
        assert_eq!(event.to_string(), "Control(0, 0) NOTE_ON value:100 ch:1");
    }
}
