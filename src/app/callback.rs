//! Closure-backed application

use super::{Application, MidasEvent, MidasOutputEvent, Outbox, Registries};
use crate::error::Result;
use crate::message::{BoundSysexMessage, MessageCodes};
use tracing::debug;

pub type EventHandler = Box<dyn FnMut(&MidasEvent, &mut Outbox)>;
pub type SysexHandler = Box<dyn FnMut(&str, &BoundSysexMessage, &mut Outbox)>;

/// An application assembled from registries and closures
///
/// Useful for profile-driven setups where no custom type is needed.
pub struct CallbackApplication {
    name: String,
    registries: Registries,
    codes: Option<MessageCodes>,
    on_event: EventHandler,
    on_sysex: Option<SysexHandler>,
    active: bool,
}

impl CallbackApplication {
    pub fn new(
        name: impl Into<String>,
        registries: Registries,
        on_event: impl FnMut(&MidasEvent, &mut Outbox) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            registries,
            codes: None,
            on_event: Box::new(on_event),
            on_sysex: None,
            active: false,
        }
    }

    /// Mirror every input back to its control as feedback
    pub fn echo(name: impl Into<String>, registries: Registries) -> Self {
        Self::new(name, registries, |event, outbox| {
            outbox.emit(MidasOutputEvent::new(event.control, event.command, event.value));
        })
    }

    pub fn with_codes(mut self, codes: MessageCodes) -> Self {
        self.codes = Some(codes);
        self
    }

    pub fn with_sysex_handler(
        mut self,
        handler: impl FnMut(&str, &BoundSysexMessage, &mut Outbox) + 'static,
    ) -> Self {
        self.on_sysex = Some(Box::new(handler));
        self
    }

    /// Between `on_activate` and `on_deactivate`
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Application for CallbackApplication {
    fn name(&self) -> &str {
        &self.name
    }

    fn registries(&self) -> &Registries {
        &self.registries
    }

    fn registries_mut(&mut self) -> &mut Registries {
        &mut self.registries
    }

    fn message_codes(&self) -> Option<&MessageCodes> {
        self.codes.as_ref()
    }

    fn on_attach(&mut self, page: &str, index: usize) {
        debug!("{} attached to page '{}' at {}", self.name, page, index);
    }

    fn on_activate(&mut self) -> Result<()> {
        self.active = true;
        self.setup_mappings()
    }

    fn on_deactivate(&mut self) {
        self.active = false;
    }

    fn on_midas_event(&mut self, event: &MidasEvent, outbox: &mut Outbox) {
        (self.on_event)(event, outbox);
    }

    fn on_sysex_event(&mut self, name: &str, message: &BoundSysexMessage, outbox: &mut Outbox) {
        if let Some(handler) = self.on_sysex.as_mut() {
            handler(name, message, outbox);
        }
    }
}
