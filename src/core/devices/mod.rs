// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Device registry and dispatch bus
//!
//! This module defines the trait-based abstraction that keeps the CPU
//! core decoupled from concrete peripheral types. The CPU only ever
//! calls [`DeviceRegistry::dispatch`] with the unit/operation pair it
//! decoded from an IOT instruction; it never knows which peripheral
//! answers, and peripherals reach each other only through the interrupt
//! request line.
//!
//! # Design Goals
//!
//! - **Decoupling**: the CPU doesn't need to know about specific
//!   peripheral types
//! - **Extensibility**: new peripherals can be added without modifying
//!   the CPU or the registry
//! - **Testability**: devices can be tested in isolation with mock
//!   implementations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             Device Registry                 │
//! ├─────────────────────────────────────────────┤
//! │  devices: Vec<Box<dyn Device>>              │
//! │  units:   unit code → device index          │
//! │                                             │
//! │  dispatch(unit, word, ctx) {                │
//! │    devices[units[unit]].dispatch(word, ctx) │
//! │  }                                          │
//! └─────────────────────────────────────────────┘
//!           ▲                   ▲
//!           │                   │
//!    ┌──────┴──────┐    ┌──────┴──────┐
//!    │  Teletype   │    │  PaperTape  │
//!    │  (Device)   │    │  (Device)   │
//!    └─────────────┘    └─────────────┘
//! ```
//!
//! A device mutates processor state only through the [`IoContext`]
//! handed to it during dispatch, which exposes exactly the register
//! file and the interrupt controller's post/withdraw pair. No other
//! write path exists, so partial updates cannot leak out of a dispatch.

pub mod punch;
pub mod teletype;

pub use punch::PaperTape;
pub use teletype::Teletype;

use std::collections::HashMap;
use std::path::Path;

use super::error::{DeviceError, EmulatorError, Result};
use super::interrupt::InterruptController;
use super::registers::RegisterFile;

/// Processor state a device may observe and mutate during dispatch
///
/// The register file carries AC for data transfers and PC for the IOT
/// skip; the interrupt controller accepts request posts/withdrawals.
pub struct IoContext<'a> {
    pub regs: &'a mut RegisterFile,
    pub intr: &'a mut InterruptController,
}

impl IoContext<'_> {
    /// Skip the next instruction (the IOT skip-on-flag response)
    pub fn skip(&mut self) {
        let pc = self.regs.pc();
        self.regs.set_pc(pc.wrapping_add(1));
    }
}

/// A peripheral on the I/O bus
///
/// One implementation per peripheral type; a single device may answer
/// several unit codes (the KL8E teletype claims 03 and 04). Records
/// persist for the process lifetime; there is no dynamic removal.
///
/// Dispatch must complete synchronously before the next instruction
/// proceeds, so a device must never block; input devices use the
/// [`tick`](Device::tick) poll instead.
pub trait Device {
    /// Unit codes this device answers to, fixed for its lifetime
    fn units(&self) -> &[u8];

    /// Mnemonic used by mount commands, e.g. "tty"
    fn name(&self) -> &str;

    /// Resolve a mount mnemonic to one of this device's units
    ///
    /// Default: the device answers only its own [`name`](Device::name),
    /// on its first unit. A device whose units mount separately (the
    /// PC8E reader and punch) overrides this with one mnemonic per
    /// unit.
    fn unit_for_name(&self, name: &str) -> Option<u8> {
        (name == self.name()).then(|| self.units()[0])
    }

    /// Hardware designation for logging, e.g. "KL8E"
    fn label(&self) -> &str;

    /// Attach a backing resource to one of this device's units
    ///
    /// Default: the device has no mountable media.
    fn mount(&mut self, unit: u8, path: &Path) -> std::result::Result<(), DeviceError> {
        let _ = (unit, path);
        Err(DeviceError::NotMountable(self.name().to_string()))
    }

    /// Respond to a decoded IOT
    ///
    /// `word` is the full 12-bit instruction; the device extracts its
    /// unit and pulse bits itself.
    fn dispatch(&mut self, word: u16, ctx: &mut IoContext) -> Result<()>;

    /// Called once at system start, in registration order
    fn power_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once at system stop; must be idempotent
    fn power_down(&mut self) {}

    /// The CAF "clear all flags" pulse
    ///
    /// A device with a raised flag withdraws its request here so the
    /// controller's count stays paired.
    fn io_reset(&mut self, ctx: &mut IoContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Cooperative poll between instructions
    ///
    /// The only place an input device may move data in; it must not
    /// block.
    fn tick(&mut self, ctx: &mut IoContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Table of installed peripherals, keyed by unit code
///
/// # Example
/// ```
/// use pdp8e::core::console::BufferConsole;
/// use pdp8e::core::devices::{DeviceRegistry, Teletype};
///
/// let mut registry = DeviceRegistry::new();
/// registry
///     .register(Box::new(Teletype::new(Box::new(BufferConsole::new()))))
///     .unwrap();
/// assert!(registry.is_registered(0o03));
/// ```
pub struct DeviceRegistry {
    /// Installed devices, in registration order
    devices: Vec<Box<dyn Device>>,
    /// Unit code to device index
    units: HashMap<u8, usize>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            units: HashMap::new(),
        }
    }

    /// Install a device, claiming every unit code it answers to
    ///
    /// # Errors
    ///
    /// [`EmulatorError::DuplicateUnit`] if any unit is already claimed.
    /// The check runs before any mutation, so a rejected registration
    /// leaves the registry exactly as it was.
    pub fn register(&mut self, device: Box<dyn Device>) -> Result<()> {
        for &unit in device.units() {
            if let Some(&idx) = self.units.get(&unit) {
                return Err(EmulatorError::DuplicateUnit {
                    unit,
                    label: self.devices[idx].label().to_string(),
                });
            }
        }
        let idx = self.devices.len();
        for &unit in device.units() {
            self.units.insert(unit, idx);
        }
        log::info!(
            "registered {} ({}) on units {:?}",
            device.name(),
            device.label(),
            device.units()
        );
        self.devices.push(device);
        Ok(())
    }

    /// True iff some device answers `unit`
    pub fn is_registered(&self, unit: u8) -> bool {
        self.units.contains_key(&unit)
    }

    /// Number of installed devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Attach a backing resource to a registered unit
    ///
    /// # Errors
    ///
    /// [`EmulatorError::UnknownUnit`] if nothing answers `unit`, or the
    /// device's own error if the resource cannot be opened. Both are
    /// non-fatal: the caller reports to the operator and the unit stays
    /// idle.
    pub fn mount(&mut self, unit: u8, path: &Path) -> Result<()> {
        let idx = *self
            .units
            .get(&unit)
            .ok_or(EmulatorError::UnknownUnit { unit })?;
        self.devices[idx].mount(unit, path)?;
        log::info!("unit {:02o} mounted {}", unit, path.display());
        Ok(())
    }

    /// Attach a backing resource by device mnemonic
    ///
    /// Each device maps the mnemonic to a unit via
    /// [`unit_for_name`](Device::unit_for_name), so "ptr" and "ptp"
    /// reach the two halves of the same PC8E controller.
    pub fn mount_by_name(&mut self, name: &str, path: &Path) -> Result<()> {
        for device in &mut self.devices {
            if let Some(unit) = device.unit_for_name(name) {
                device.mount(unit, path)?;
                log::info!("{} mounted {}", name, path.display());
                return Ok(());
            }
        }
        Err(EmulatorError::UnknownDevice(name.to_string()))
    }

    /// Forward a decoded IOT to the device answering `unit`
    ///
    /// # Errors
    ///
    /// [`EmulatorError::UnregisteredDispatch`] if nothing answers
    /// `unit`. The decode stage must never produce such a unit, so this
    /// is fatal.
    pub fn dispatch(&mut self, unit: u8, word: u16, ctx: &mut IoContext) -> Result<()> {
        let idx = *self
            .units
            .get(&unit)
            .ok_or(EmulatorError::UnregisteredDispatch { unit })?;
        self.devices[idx].dispatch(word, ctx)
    }

    /// Power every device up, in registration order
    pub fn power_up(&mut self) -> Result<()> {
        for device in &mut self.devices {
            device.power_up()?;
        }
        Ok(())
    }

    /// Power every device down, in registration order
    pub fn power_down(&mut self) {
        for device in &mut self.devices {
            device.power_down();
        }
    }

    /// Broadcast the CAF clear-all-flags pulse
    pub fn io_reset(&mut self, ctx: &mut IoContext) -> Result<()> {
        for device in &mut self.devices {
            device.io_reset(ctx)?;
        }
        Ok(())
    }

    /// Give every device its between-instructions poll
    pub fn tick_all(&mut self, ctx: &mut IoContext) -> Result<()> {
        for device in &mut self.devices {
            device.tick(ctx)?;
        }
        Ok(())
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
