//! Device output collaborators
//!
//! The engine never touches a MIDI port. Everything it wants to send goes
//! through a [`DeviceOutput`]; the host supplies the real one.

use crate::midi::format_hex;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

/// Sink for messages headed to the device
pub trait DeviceOutput {
    /// Short message; `status` is the base status and `channel` is folded in
    /// by the receiver's own convention
    fn send(&mut self, status: u8, channel: u8, data1: u8, data2: u8);

    /// Complete `F0 .. F7` frame
    fn send_sysex(&mut self, frame: &[u8]);
}

/// One message handed to an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputMessage {
    Short { status: u8, channel: u8, data1: u8, data2: u8 },
    Sysex { frame: Vec<u8> },
}

impl fmt::Display for OutputMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMessage::Short { status, channel, data1, data2 } => write!(
                f,
                "status:{:02X} ch:{} d1:{} d2:{}",
                status, channel, data1, data2
            ),
            OutputMessage::Sysex { frame } => write!(f, "sysex [{}]", format_hex(frame)),
        }
    }
}

/// Output that only logs, for running without hardware
#[derive(Debug)]
pub struct LogOutput {
    name: String,
    sent: u64,
}

impl LogOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: 0,
        }
    }

    /// Messages logged so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn log(&mut self, message: &OutputMessage) {
        self.sent += 1;
        info!(
            "🎹 [{}] Output '{}' → {} [#{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            message,
            self.sent
        );
        debug!(output = %self.name, message = ?message, "LogOutput send");
    }
}

impl DeviceOutput for LogOutput {
    fn send(&mut self, status: u8, channel: u8, data1: u8, data2: u8) {
        self.log(&OutputMessage::Short { status, channel, data1, data2 });
    }

    fn send_sysex(&mut self, frame: &[u8]) {
        self.log(&OutputMessage::Sysex { frame: frame.to_vec() });
    }
}

/// Output that keeps every message; clones share one log
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    sent: Rc<RefCell<Vec<OutputMessage>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything sent so far
    pub fn messages(&self) -> Vec<OutputMessage> {
        self.sent.borrow().clone()
    }

    /// Remove and return everything sent so far
    pub fn take(&self) -> Vec<OutputMessage> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }
}

impl DeviceOutput for RecordingOutput {
    fn send(&mut self, status: u8, channel: u8, data1: u8, data2: u8) {
        self.sent
            .borrow_mut()
            .push(OutputMessage::Short { status, channel, data1, data2 });
    }

    fn send_sysex(&mut self, frame: &[u8]) {
        self.sent.borrow_mut().push(OutputMessage::Sysex { frame: frame.to_vec() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_output_shares_log() {
        let recorder = RecordingOutput::new();
        let mut boxed: Box<dyn DeviceOutput> = Box::new(recorder.clone());

        boxed.send(0x90, 0, 53, 127);
        boxed.send_sysex(&[0xF0, 0x01, 0xF7]);

        assert_eq!(
            recorder.messages(),
            vec![
                OutputMessage::Short { status: 0x90, channel: 0, data1: 53, data2: 127 },
                OutputMessage::Sysex { frame: vec![0xF0, 0x01, 0xF7] },
            ]
        );
        assert_eq!(recorder.take().len(), 2);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_log_output_counts() {
        let mut output = LogOutput::new("test");
        output.send(0xB0, 1, 7, 100);
        output.send_sysex(&[0xF0, 0xF7]);
        assert_eq!(output.sent(), 2);
    }

    #[test]
    fn test_display() {
        let short = OutputMessage::Short { status: 0x90, channel: 2, data1: 1, data2: 2 };
        assert_eq!(short.to_string(), "status:90 ch:2 d1:1 d2:2");
    }
}
