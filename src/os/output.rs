//! Event intake and output delegation for the active page

use super::MidasOs;
use crate::app::{dispatch, Application, MidasOutputEvent, Outbound, Outbox};
use crate::midi::WireEvent;
use crate::output::DeviceOutput;
use crate::registry::Command;
use tracing::{trace, warn};

impl MidasOs {
    /// Send `event` to the device through the wire address the application
    /// at `page`/`index` has for its control
    ///
    /// Silently returns `false` for an unknown page or index, and for a
    /// control or command the application cannot resolve.
    pub fn delegate_midas_out(&mut self, page: &str, index: usize, event: &MidasOutputEvent) -> bool {
        let Some(app) = self.pages.iter().find(|p| p.name() == page).and_then(|p| p.get(index)) else {
            trace!("delegate_midas_out: no application {} on page '{}'", index, page);
            return false;
        };
        route_output(app, self.output.as_mut(), event)
    }

    /// Dispatch a wire event to every application on the active page
    ///
    /// Whatever the handlers queue is delivered right away. Returns the
    /// number of semantic events delivered across the page.
    pub fn process(&mut self, event: &WireEvent) -> usize {
        let Some(active) = self.active_page.as_deref() else {
            trace!("No active page, dropping {}", event);
            return 0;
        };
        let Some(page) = self.pages.iter_mut().find(|p| p.name() == active) else {
            return 0;
        };

        let mut delivered = 0;
        for app in page.apps_mut() {
            let mut outbox = Outbox::new();
            delivered += dispatch(app.as_mut(), event, &mut outbox);
            for item in outbox.drain() {
                deliver(app.as_ref(), self.output.as_mut(), item);
            }
        }
        delivered
    }

    /// Host tick for the active page's applications
    pub fn update(&mut self) {
        let Some(active) = self.active_page.as_deref() else {
            return;
        };
        if let Some(page) = self.pages.iter_mut().find(|p| p.name() == active) {
            for app in page.apps_mut() {
                app.on_midas_update();
            }
        }
    }
}

fn deliver(app: &dyn Application, output: &mut dyn DeviceOutput, item: Outbound) {
    match item {
        Outbound::Midas(event) => {
            if !route_output(app, output, &event) {
                warn!("⚠️  {}: cannot route {} to the device", app.name(), event.control);
            }
        }
        Outbound::Short { status, channel, data1, data2 } => output.send(status, channel, data1, data2),
        Outbound::Sysex { frame } => output.send_sysex(&frame),
    }
}

/// Resolve the control and command through `app`'s registries and send
///
/// Control change feedback resolves through the controller map, everything
/// else through the button map.
fn route_output(app: &dyn Application, output: &mut dyn DeviceOutput, event: &MidasOutputEvent) -> bool {
    let registries = app.registries();
    let map = match event.command {
        Command::ControlChange => &registries.controller_map,
        _ => &registries.button_map,
    };

    let Ok(address) = map.get_wire(&event.control) else {
        trace!("{}: {} has no wire address", app.name(), event.control);
        return false;
    };
    let Ok(status) = registries.command_map.get_status(event.command) else {
        trace!("{}: {} has no status", app.name(), event.command);
        return false;
    };

    output.send(status, address.port(), address.note(), event.value);
    true
}
