//! Bidirectional Control <-> WireAddress registry

use super::{Control, WireAddress};
use crate::error::{MidasError, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Insertion-ordered map between controls and wire addresses
///
/// A control may be registered without an address (`None`), which is how
/// positional generation pads controls that have no encoding yet. Several
/// controls may share one address (fan-out) only when registered through
/// [`ControlMap::emplace_shared`] or the positional builders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlMap {
    entries: Vec<(Control, Option<WireAddress>)>,
    index: HashMap<Control, usize>,
    by_wire: HashMap<WireAddress, Vec<Control>>,
}

impl ControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `control` to `address`; fails if either side is already bound
    pub fn emplace(&mut self, control: Control, address: WireAddress) -> Result<()> {
        self.ensure_new_control(control)?;
        if let Some(existing) = self.by_wire.get(&address).and_then(|c| c.first()) {
            return Err(MidasError::DuplicateKey(format!(
                "{} is already bound to {}",
                address, existing
            )));
        }
        self.push(control, Some(address));
        Ok(())
    }

    /// Bind `control` to an address that other controls may already use
    pub fn emplace_shared(&mut self, control: Control, address: WireAddress) -> Result<()> {
        self.ensure_new_control(control)?;
        self.push(control, Some(address));
        Ok(())
    }

    /// Register `control` without a wire encoding
    pub fn emplace_unbound(&mut self, control: Control) -> Result<()> {
        self.ensure_new_control(control)?;
        self.push(control, None);
        Ok(())
    }

    /// Every control bound to `address`, in registration order
    pub fn get_by_wire(&self, address: &WireAddress) -> &[Control] {
        self.by_wire.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_first_by_wire(&self, address: &WireAddress) -> Option<Control> {
        self.get_by_wire(address).first().copied()
    }

    /// Wire address of `control`; missing and unbound controls are both errors
    pub fn get_wire(&self, control: &Control) -> Result<WireAddress> {
        match self.binding(control) {
            Some(Some(address)) => Ok(address),
            Some(None) => Err(MidasError::NotFound(format!("{} has no wire address", control))),
            None => Err(MidasError::NotFound(format!("{} is not registered", control))),
        }
    }

    /// `None` when unregistered, `Some(None)` when registered but unbound
    pub fn binding(&self, control: &Control) -> Option<Option<WireAddress>> {
        self.index.get(control).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, control: &Control) -> bool {
        self.index.contains_key(control)
    }

    /// True when `control` is registered and bound to exactly `address`
    pub fn contains_equal(&self, control: &Control, address: &WireAddress) -> bool {
        self.binding(control) == Some(Some(*address))
    }

    /// Register controls positionally against addresses
    ///
    /// Controls past the end of `addresses` are registered unbound. Repeated
    /// addresses fan out. A repeated or already registered control fails the
    /// whole call.
    pub fn generate(&mut self, controls: &[Control], addresses: &[WireAddress]) -> Result<()> {
        let mut pending = HashSet::with_capacity(controls.len());
        for control in controls {
            if self.contains(control) || !pending.insert(*control) {
                return Err(MidasError::DuplicateKey(format!("{} is already registered", control)));
            }
        }

        for (i, control) in controls.iter().enumerate() {
            self.push(*control, addresses.get(i).copied());
        }
        if addresses.len() > controls.len() {
            debug!(
                "Ignoring {} addresses with no matching control",
                addresses.len() - controls.len()
            );
        }
        Ok(())
    }

    /// Clear and generate; the map is untouched if generation would fail
    pub fn regenerate(&mut self, controls: &[Control], addresses: &[WireAddress]) -> Result<()> {
        let mut fresh = Self::new();
        fresh.generate(controls, addresses)?;
        *self = fresh;
        Ok(())
    }

    /// Reassign addresses to the existing controls in registration order
    pub fn retarget(&mut self, addresses: &[WireAddress]) {
        self.by_wire.clear();
        for (i, (control, binding)) in self.entries.iter_mut().enumerate() {
            *binding = addresses.get(i).copied();
            if let Some(address) = binding {
                self.by_wire.entry(*address).or_default().push(*control);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Control, Option<WireAddress>)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.by_wire.clear();
    }

    fn ensure_new_control(&self, control: Control) -> Result<()> {
        if self.contains(&control) {
            return Err(MidasError::DuplicateKey(format!("{} is already registered", control)));
        }
        Ok(())
    }

    fn push(&mut self, control: Control, address: Option<WireAddress>) {
        self.index.insert(control, self.entries.len());
        self.entries.push((control, address));
        if let Some(address) = address {
            self.by_wire.entry(address).or_default().push(control);
        }
    }
}
