//! Device message descriptions
//!
//! - [`behavior`]: how a raw status encodes channel and note
//! - [`sysex`]: framed system exclusive messages with validated parameters
//! - [`codes`]: named registries of both, split by direction

pub mod behavior;
pub mod codes;
pub mod sysex;

pub use behavior::{BoundMidiMessage, MidiMessage, MidiMessageBehavior, Resolved, TargetedMidiMessage};
pub use codes::{Direction, MessageCodes};
pub use sysex::{BoundSysexMessage, SysexMessage, SysexParameter};
