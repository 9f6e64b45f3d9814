//! System exclusive messages with declared parameters
//!
//! Wire format: `F0 <device id> <command code> <parameter bytes> F7`.

use crate::error::{MidasError, Result};
use crate::midi::{check_sysex_frame, format_hex, SYSEX_END, SYSEX_START};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One fixed-width parameter with an optional closed set of legal values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysexParameter {
    pub width: usize,
    /// Empty means any bytes of the right width are legal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Vec<u8>>,
}

impl SysexParameter {
    pub fn new(width: usize, options: Vec<Vec<u8>>) -> Self {
        Self { width, options }
    }

    /// A parameter that accepts any value
    pub fn open(width: usize) -> Self {
        Self::new(width, Vec::new())
    }

    /// Single-byte parameter restricted to `values`
    pub fn one_of(values: &[u8]) -> Self {
        Self::new(1, values.iter().map(|v| vec![*v]).collect())
    }

    pub fn accepts(&self, bytes: &[u8]) -> bool {
        bytes.len() == self.width && (self.options.is_empty() || self.options.iter().any(|o| o == bytes))
    }
}

/// A sysex message definition: device id, command code and ordered parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysexMessage {
    device_id: Vec<u8>,
    command: Vec<u8>,
    params: Vec<(String, SysexParameter)>,
}

impl SysexMessage {
    pub fn new<S: Into<String>>(
        device_id: Vec<u8>,
        command: Vec<u8>,
        params: impl IntoIterator<Item = (S, SysexParameter)>,
    ) -> Self {
        Self {
            device_id,
            command,
            params: params.into_iter().map(|(name, p)| (name.into(), p)).collect(),
        }
    }

    pub fn device_id(&self) -> &[u8] {
        &self.device_id
    }

    pub fn command(&self) -> &[u8] {
        &self.command
    }

    pub fn params(&self) -> &[(String, SysexParameter)] {
        &self.params
    }

    /// Sum of the declared parameter widths
    pub fn payload_len(&self) -> usize {
        self.params.iter().map(|(_, p)| p.width).sum()
    }

    /// Check payload length and per-parameter options
    pub fn validate(&self, data: &[u8]) -> Result<()> {
        let expected = self.payload_len();
        if data.len() != expected {
            return Err(MidasError::Validation(format!(
                "sysex {} expects {} payload bytes, got {}",
                format_hex(&self.command),
                expected,
                data.len()
            )));
        }

        let mut offset = 0;
        for (name, param) in &self.params {
            let slice = &data[offset..offset + param.width];
            if !param.accepts(slice) {
                return Err(MidasError::Validation(format!(
                    "[{}] is not a valid option for parameter {}",
                    format_hex(slice),
                    name
                )));
            }
            offset += param.width;
        }
        Ok(())
    }

    /// Frame `data` for the wire after validating it
    pub fn get(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.validate(data)?;
        Ok(self.frame(data))
    }

    pub fn bind(&self, data: &[u8]) -> Result<BoundSysexMessage> {
        self.validate(data)?;
        Ok(BoundSysexMessage {
            message: self.clone(),
            data: data.to_vec(),
        })
    }

    /// Compares the command code only
    pub fn matches(&self, command: &[u8]) -> bool {
        self.command == command
    }

    /// True when `frame` carries this message's device id and command code
    pub fn is_frame_of(&self, frame: &[u8]) -> bool {
        let header_len = 1 + self.device_id.len() + self.command.len();
        frame.len() > header_len
            && frame[0] == SYSEX_START
            && frame[frame.len() - 1] == SYSEX_END
            && frame[1..1 + self.device_id.len()] == self.device_id[..]
            && frame[1 + self.device_id.len()..header_len] == self.command[..]
    }

    /// Parse a received frame back into a bound message
    pub fn decode(&self, frame: &[u8]) -> Result<BoundSysexMessage> {
        check_sysex_frame(frame)?;
        if !self.is_frame_of(frame) {
            return Err(MidasError::Validation(format!(
                "frame [{}] is not a {} message",
                format_hex(frame),
                format_hex(&self.command)
            )));
        }
        let header_len = 1 + self.device_id.len() + self.command.len();
        self.bind(&frame[header_len..frame.len() - 1])
    }

    fn frame(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.device_id.len() + self.command.len() + data.len() + 2);
        out.push(SYSEX_START);
        out.extend_from_slice(&self.device_id);
        out.extend_from_slice(&self.command);
        out.extend_from_slice(data);
        out.push(SYSEX_END);
        out
    }
}

impl fmt::Display for SysexMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SysexMessage([{}], [{}], {} params)",
            format_hex(&self.device_id),
            format_hex(&self.command),
            self.params.len()
        )
    }
}

/// A sysex message with a validated payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSysexMessage {
    message: SysexMessage,
    data: Vec<u8>,
}

impl BoundSysexMessage {
    pub fn message(&self) -> &SysexMessage {
        &self.message
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Full wire frame
    pub fn get(&self) -> Vec<u8> {
        self.message.frame(&self.data)
    }

    /// Compares the command code only, never the bound payload
    pub fn matches(&self, command: &[u8]) -> bool {
        self.message.matches(command)
    }

    /// Bytes of the named parameter
    pub fn param(&self, name: &str) -> Option<&[u8]> {
        let mut offset = 0;
        for (param_name, param) in &self.message.params {
            if param_name == name {
                return self.data.get(offset..offset + param.width);
            }
            offset += param.width;
        }
        None
    }
}
