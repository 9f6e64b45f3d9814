//! Wire event to semantic event dispatch

use super::{Application, MidasEvent, Outbox};
use crate::message::BoundSysexMessage;
use crate::midi::{format_hex, WireEvent};
use crate::registry::{Command, WireAddress};
use tracing::{debug, trace};

/// Decode `event` with `app`'s registries and deliver the results
///
/// Note on/off resolve through the button map, control change through the
/// controller map. Every control bound to the address gets its own event.
/// Unknown statuses and unmapped addresses deliver nothing. Returns the
/// number of events delivered.
pub fn dispatch<A: Application + ?Sized>(app: &mut A, event: &WireEvent, outbox: &mut Outbox) -> usize {
    app.on_midas_process(event);

    if let Some(frame) = &event.sysex {
        return dispatch_sysex(app, frame, outbox);
    }

    let events = decode(app, event);
    for midas_event in &events {
        app.on_midas_event(midas_event, outbox);
    }
    events.len()
}

fn decode<A: Application + ?Sized>(app: &A, event: &WireEvent) -> Vec<MidasEvent> {
    let registries = app.registries();
    let Some((command, channel)) = registries.command_map.classify(event.status) else {
        trace!("{}: no command for status {:02X}", app.name(), event.status);
        return Vec::new();
    };

    let map = match command {
        Command::NoteOn | Command::NoteOff => &registries.button_map,
        Command::ControlChange => &registries.controller_map,
        _ => {
            trace!("{}: {} is not dispatched", app.name(), command);
            return Vec::new();
        }
    };

    let Ok(address) = WireAddress::new(event.port as i64, event.data1 as i64) else {
        return Vec::new();
    };
    let controls = map.get_by_wire(&address);
    if controls.is_empty() {
        trace!("{}: {} unmapped", app.name(), address);
    } else {
        debug!("{}: {} {} → {} control(s)", app.name(), command, address, controls.len());
    }

    controls
        .iter()
        .map(|control| MidasEvent {
            control: *control,
            command,
            value: event.data2,
            channel,
        })
        .collect()
}

fn dispatch_sysex<A: Application + ?Sized>(app: &mut A, frame: &[u8], outbox: &mut Outbox) -> usize {
    let matched: Option<(String, BoundSysexMessage)> = {
        let Some(codes) = app.message_codes() else {
            return 0;
        };
        let Some((name, message)) = codes.match_sysex(frame) else {
            trace!("{}: unknown sysex [{}]", app.name(), format_hex(frame));
            return 0;
        };
        match message.decode(frame) {
            Ok(bound) => Some((name.to_string(), bound)),
            Err(e) => {
                debug!("{}: skipping {} frame: {}", app.name(), name, e);
                None
            }
        }
    };

    match matched {
        Some((name, bound)) => {
            app.on_sysex_event(&name, &bound, outbox);
            1
        }
        None => 0,
    }
}
