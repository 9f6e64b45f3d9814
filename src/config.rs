//! Device profiles
//!
//! A profile is a YAML file describing one controller: its command statuses,
//! its buttons and controllers, the named MIDI and sysex messages it speaks
//! and, optionally, how its traffic maps to MDDS signals. The MiniLab mkII
//! profile is embedded and used when no file is given.

use crate::app::Registries;
use crate::mdds::{Id, MddsCommand, MddsRoute, SignalMap};
use crate::message::{Direction, MessageCodes, MidiMessage, MidiMessageBehavior, SysexMessage, SysexParameter};
use crate::midi::parse_hex;
use crate::os::OsOptions;
use crate::registry::{Command, Control, ControlMap, WireAddress};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

/// Embedded MiniLab mkII profile
pub const DEFAULT_PROFILE: &str = include_str!("../profiles/minilab-mk2.yaml");

static DEFAULT: OnceLock<DeviceProfile> = OnceLock::new();

/// Root profile structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceProfile {
    pub name: String,
    #[serde(default)]
    pub os: OsOptions,
    /// Status overrides; empty means the standard statuses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandDef>,
    #[serde(default)]
    pub buttons: Vec<ControlDef>,
    #[serde(default)]
    pub controllers: Vec<ControlDef>,
    #[serde(default)]
    pub midi: MessageSet<MidiDef>,
    #[serde(default)]
    pub sysex: MessageSet<SysexDef>,
    #[serde(default)]
    pub signals: SignalDefs,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandDef {
    pub command: Command,
    pub status: u8,
}

/// A control and its wire address; omit `port`/`note` for an unbound control
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlDef {
    pub group: u32,
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<u8>,
    /// Allow other controls on the same address
    #[serde(default)]
    pub shared: bool,
}

/// Input and output definitions; either side may be omitted
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct MessageSet<T> {
    #[serde(default)]
    pub input: Vec<T>,
    #[serde(default)]
    pub output: Vec<T>,
}

impl<T> Default for MessageSet<T> {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            output: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiDef {
    pub name: String,
    pub status: u8,
    #[serde(default)]
    pub behavior: MidiMessageBehavior,
}

/// Byte fields are hex strings such as `"00 20 6B 7F 42"`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SysexDef {
    pub name: String,
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub params: Vec<ParamDef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

fn default_width() -> usize {
    1
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SignalDefs {
    #[serde(default)]
    pub midi: Vec<MidiSignalDef>,
    #[serde(default)]
    pub sysex: Vec<SysexSignalDef>,
}

/// Short message pattern; omitted fields match anything
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiSignalDef {
    pub status: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    /// MDDS command name, e.g. `pressed`
    pub signal: String,
    #[serde(default = "default_control_id")]
    pub control: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SysexSignalDef {
    pub frame: String,
    pub signal: String,
    #[serde(default = "default_control_id")]
    pub control: String,
}

fn default_control_id() -> String {
    "00 00 00 00".to_string()
}

impl DeviceProfile {
    /// Load and validate a profile from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        let profile = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid profile: {}", path.display()))?;

        info!("✅ Profile '{}' loaded from {}", profile.name, path.display());
        Ok(profile)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let profile: DeviceProfile = serde_yaml::from_str(contents).context("Failed to parse YAML profile")?;
        profile.validate()?;
        Ok(profile)
    }

    /// Structural checks; duplicate bindings surface when building registries
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Profile name cannot be empty");
        }

        for (kind, defs) in [("button", &self.buttons), ("controller", &self.controllers)] {
            let mut seen = HashSet::new();
            for def in defs {
                if !seen.insert((def.group, def.index)) {
                    anyhow::bail!("Duplicate {} Control({}, {})", kind, def.group, def.index);
                }
                if def.port.is_some() != def.note.is_some() {
                    anyhow::bail!(
                        "{} Control({}, {}) needs both port and note, or neither",
                        kind,
                        def.group,
                        def.index
                    );
                }
            }
        }

        for def in self.sysex.input.iter().chain(&self.sysex.output) {
            if def.name.is_empty() {
                anyhow::bail!("Sysex message name cannot be empty");
            }
            for param in &def.params {
                if param.width == 0 {
                    anyhow::bail!("Parameter {} of {} has zero width", param.name, def.name);
                }
            }
        }

        for def in &self.signals.midi {
            if MddsCommand::by_name(&def.signal).is_none() {
                anyhow::bail!("Unknown MDDS signal '{}'", def.signal);
            }
        }
        for def in &self.signals.sysex {
            let Some(command) = MddsCommand::by_name(&def.signal) else {
                anyhow::bail!("Unknown MDDS signal '{}'", def.signal);
            };
            if command.payload_description().fixed_len().is_some() {
                anyhow::bail!(
                    "MDDS signal '{}' has a fixed payload and cannot carry sysex [{}]",
                    def.signal,
                    def.frame
                );
            }
        }

        Ok(())
    }

    /// Build a fresh set of registries from this profile
    pub fn registries(&self) -> Result<Registries> {
        let mut registries = if self.commands.is_empty() {
            Registries::with_default_commands()
        } else {
            let mut registries = Registries::new();
            for def in &self.commands {
                registries
                    .command_map
                    .emplace(def.command, def.status)
                    .with_context(|| format!("Invalid command {}", def.command))?;
            }
            registries
        };

        fill_controls(&mut registries.button_map, &self.buttons).context("Invalid buttons")?;
        fill_controls(&mut registries.controller_map, &self.controllers).context("Invalid controllers")?;
        Ok(registries)
    }

    /// Named MIDI and sysex messages, on top of the standard inputs
    pub fn message_codes(&self) -> Result<MessageCodes> {
        let mut codes = MessageCodes::with_defaults();
        for (direction, defs) in [(Direction::Input, &self.midi.input), (Direction::Output, &self.midi.output)] {
            for def in defs {
                codes
                    .emplace_midi(direction, &def.name, MidiMessage::new(def.status, def.behavior))
                    .with_context(|| format!("Invalid MIDI message {}", def.name))?;
            }
        }
        for (direction, defs) in [(Direction::Input, &self.sysex.input), (Direction::Output, &self.sysex.output)] {
            for def in defs {
                let message = def
                    .to_message()
                    .with_context(|| format!("Invalid sysex message {}", def.name))?;
                codes.emplace_sysex(direction, &def.name, message)?;
            }
        }
        Ok(codes)
    }

    pub fn signal_map(&self) -> Result<SignalMap> {
        let mut map = SignalMap::new();
        for def in &self.signals.midi {
            let route = route_for(&def.signal, &def.control)?;
            map.map_midi(def.status, def.port, def.note, def.value, route)
                .with_context(|| format!("Invalid signal for status {:02X}", def.status))?;
        }
        for def in &self.signals.sysex {
            let route = route_for(&def.signal, &def.control)?;
            let frame = parse_hex(&def.frame)?;
            map.map_sysex(&frame, route)
                .with_context(|| format!("Invalid signal frame [{}]", def.frame))?;
        }
        Ok(map)
    }
}

impl SysexDef {
    fn to_message(&self) -> Result<SysexMessage> {
        let mut params = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let options = param
                .options
                .iter()
                .map(|o| parse_hex(o))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if let Some(bad) = options.iter().find(|o| o.len() != param.width) {
                anyhow::bail!(
                    "option of {} bytes does not fit {} ({} bytes wide)",
                    bad.len(),
                    param.name,
                    param.width
                );
            }
            params.push((param.name.clone(), SysexParameter::new(param.width, options)));
        }
        Ok(SysexMessage::new(parse_hex(&self.device_id)?, parse_hex(&self.command)?, params))
    }
}

fn fill_controls(map: &mut ControlMap, defs: &[ControlDef]) -> Result<()> {
    for def in defs {
        let control = Control::new(def.group, def.index);
        match (def.port, def.note) {
            (Some(port), Some(note)) => {
                let address = WireAddress::new(port as i64, note as i64)?;
                if def.shared {
                    map.emplace_shared(control, address)?;
                } else {
                    map.emplace(control, address)?;
                }
            }
            _ => map.emplace_unbound(control)?,
        }
    }
    Ok(())
}

fn route_for(signal: &str, control: &str) -> Result<MddsRoute> {
    let command = MddsCommand::by_name(signal).with_context(|| format!("Unknown MDDS signal '{}'", signal))?;
    let bytes = parse_hex(control)?;
    let control_id: Id = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("control id [{}] must be 4 bytes", control))?;
    Ok(MddsRoute::new(&command, control_id))
}

/// Embedded default profile, parsed once
pub fn load_default_profile() -> Result<DeviceProfile> {
    if let Some(profile) = DEFAULT.get() {
        return Ok(profile.clone());
    }
    let profile = DeviceProfile::from_yaml(DEFAULT_PROFILE).context("Embedded profile is invalid")?;
    let _ = DEFAULT.set(profile.clone());
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{parse_hex, WireEvent};
    use std::io::Write;

    #[test]
    fn test_default_profile() {
        let profile = load_default_profile().unwrap();
        assert_eq!(profile.name, "Arturia MiniLab mkII");

        let registries = profile.registries().unwrap();
        assert_eq!(registries.command_map.len(), 7);
        assert_eq!(registries.button_map.len(), 18);
        assert_eq!(registries.controller_map.len(), 20);
        assert_eq!(
            registries.button_map.get_wire(&Control::new(0, 15)).unwrap(),
            WireAddress::new(0, 15).unwrap()
        );

        let codes = profile.message_codes().unwrap();
        assert!(codes.sysex(Direction::Input, "SHIFT").is_some());
        assert!(codes.sysex(Direction::Output, "LED").is_some());
        let led = codes.sysex(Direction::Output, "LED").unwrap();
        assert_eq!(
            led.get(&[0x70, 0x04]).unwrap(),
            vec![0xF0, 0x00, 0x20, 0x6B, 0x7F, 0x42, 0x02, 0x00, 0x10, 0x70, 0x04, 0xF7]
        );
        assert!(led.get(&[0x99, 0x04]).is_err());

        let signals = profile.signal_map().unwrap();
        let press = WireEvent::new(0x9F, 0, 0, 100).unwrap();
        assert!(signals.route(&press).is_some());

        // Every mapped signal translates into an envelope that fits its description
        let shift = WireEvent::with_sysex(0, parse_hex("F0 00 20 6B 7F 42 02 00 00 2E 7F F7").unwrap()).unwrap();
        let knob = WireEvent::new(0xB0, 0, 3, 64).unwrap();
        for event in [press, knob, shift] {
            let envelope = signals
                .translate(&event, crate::mdds::DEVICE_ALL, crate::mdds::DAW_ALL, std::time::Duration::ZERO)
                .unwrap();
            assert!(envelope.check_payload().is_ok());
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "name: Tiny\nbuttons:\n  - {{ group: 0, index: 0, port: 0, note: 36 }}\n  - {{ group: 0, index: 1 }}\n"
        )
        .unwrap();

        let profile = DeviceProfile::load(file.path()).unwrap();
        let registries = profile.registries().unwrap();
        assert_eq!(registries.button_map.len(), 2);
        assert_eq!(registries.button_map.binding(&Control::new(0, 1)), Some(None));
        assert!(registries.controller_map.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeviceProfile::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read profile"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(DeviceProfile::from_yaml("name: ''").is_err());
        assert!(DeviceProfile::from_yaml(
            "name: X\nbuttons:\n  - { group: 0, index: 0, port: 0, note: 1 }\n  - { group: 0, index: 0, port: 0, note: 2 }"
        )
        .is_err());
        assert!(DeviceProfile::from_yaml("name: X\nbuttons:\n  - { group: 0, index: 0, port: 0 }").is_err());
        assert!(DeviceProfile::from_yaml("name: X\nsignals:\n  midi:\n    - { status: 144, signal: wiggled }").is_err());
        assert!(DeviceProfile::from_yaml(
            "name: X\nsignals:\n  sysex:\n    - { frame: 'F0 00 20 6B 7F 42 02 00 00 2E 7F F7', signal: pressed }"
        )
        .is_err());
    }

    #[test]
    fn test_address_conflicts_surface_in_registries() {
        let yaml = "name: X\nbuttons:\n  - { group: 0, index: 0, port: 0, note: 1 }\n  - { group: 0, index: 1, port: 0, note: 1 }";
        let profile = DeviceProfile::from_yaml(yaml).unwrap();
        assert!(profile.registries().is_err());

        let shared = "name: X\nbuttons:\n  - { group: 0, index: 0, port: 0, note: 1 }\n  - { group: 0, index: 1, port: 0, note: 1, shared: true }";
        let registries = DeviceProfile::from_yaml(shared).unwrap().registries().unwrap();
        assert_eq!(registries.button_map.get_by_wire(&WireAddress::new(0, 1).unwrap()).len(), 2);
    }

    #[test]
    fn test_command_overrides() {
        let yaml = "name: X\ncommands:\n  - { command: note_on, status: 144 }\n  - { command: control_change, status: 176 }";
        let registries = DeviceProfile::from_yaml(yaml).unwrap().registries().unwrap();
        assert_eq!(registries.command_map.len(), 2);
        assert_eq!(registries.command_map.get_status(Command::ControlChange).unwrap(), 0xB0);
        assert!(registries.command_map.get_status(Command::PitchBend).is_err());
    }

    #[test]
    fn test_message_sets_allow_one_side() {
        let yaml = "name: X\nmidi:\n  output:\n    - { name: PAD_LIGHT, status: 144 }\nsysex:\n  input:\n    - { name: MEMCHANGE, device_id: '00 20 6B 7F 42', command: '1B' }";
        let profile = DeviceProfile::from_yaml(yaml).unwrap();
        assert!(profile.midi.input.is_empty());
        assert_eq!(profile.midi.output.len(), 1);
        assert!(profile.sysex.output.is_empty());

        let codes = profile.message_codes().unwrap();
        assert!(codes.midi(Direction::Output, "PAD_LIGHT").is_some());
        assert!(codes.sysex(Direction::Input, "MEMCHANGE").is_some());
    }

    #[test]
    fn test_bad_sysex_option_width() {
        let yaml = "name: X\nsysex:\n  output:\n    - name: LED\n      device_id: '00 20 6B 7F 42'\n      command: '02 00 10'\n      params:\n        - { name: LED_ID, width: 1, options: ['70 71'] }";
        let profile = DeviceProfile::from_yaml(yaml).unwrap();
        assert!(profile.message_codes().is_err());
    }
}
