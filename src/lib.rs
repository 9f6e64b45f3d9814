//! Midas: MIDI event normalization and dispatch
//!
//! Wire events from a controller are classified by status, resolved to
//! abstract controls through per-application registries and delivered as
//! semantic events to the applications on the active page. Feedback travels
//! the same maps in reverse.

pub mod app;
pub mod config;
pub mod error;
pub mod key;
pub mod mdds;
pub mod message;
pub mod midi;
pub mod os;
pub mod output;
pub mod registry;

pub use error::{MidasError, Result};
