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

//! The assembled machine
//!
//! [`System`] owns the processor and the bus and drives the whole
//! machine from a single thread. One `step` is one instruction plus
//! one polling round of every installed device; there is no
//! cross-thread device access and no locking anywhere in the core.

use std::path::Path;

use super::bus::Bus;
use super::core_image::CoreImage;
use super::cpu::Cpu;
use super::devices::{Device, IoContext};
use super::error::Result;

/// Hardware configuration fixed at power-up
#[derive(Debug, Clone, Copy)]
pub struct MachineConfig {
    /// Install the KM8E and the full 32K of core
    pub extended_memory: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            extended_memory: true,
        }
    }
}

/// A complete PDP-8/E: processor, core, extension hardware, devices
///
/// # Example
/// ```
/// use pdp8e::core::system::{MachineConfig, System};
///
/// let mut system = System::new(MachineConfig::default());
/// system.deposit(0o200, 0o7402); // HLT
/// system.set_pc(0o200);
/// system.power_up().unwrap();
/// let executed = system.run(1000).unwrap();
/// assert_eq!(executed, 1);
/// assert!(system.halted());
/// ```
pub struct System {
    cpu: Cpu,
    bus: Bus,
    instructions: u64,
}

impl System {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(config.extended_memory),
            instructions: 0,
        }
    }

    /// Install a peripheral; fails if any of its unit codes collide
    pub fn install_device(&mut self, device: Box<dyn Device>) -> Result<()> {
        self.bus.devices.register(device)
    }

    /// Attach a file to the device owning `unit`
    pub fn mount(&mut self, unit: u8, path: &Path) -> Result<()> {
        self.bus.devices.mount(unit, path)
    }

    /// Attach a file to the named device's primary unit
    pub fn mount_by_name(&mut self, name: &str, path: &Path) -> Result<()> {
        self.bus.devices.mount_by_name(name, path)
    }

    /// Power-up sequence: devices first, then the run flag
    pub fn power_up(&mut self) -> Result<()> {
        self.bus.devices.power_up()?;
        self.cpu.regs_mut().set_run(true);
        log::info!(
            "powered up: {} words of core, {} device(s)",
            self.bus.memory.len(),
            self.bus.devices.len()
        );
        Ok(())
    }

    /// Orderly shutdown; devices flush whatever they hold
    pub fn power_down(&mut self) {
        self.cpu.regs_mut().set_run(false);
        self.bus.devices.power_down();
    }

    /// One machine cycle: poll every device, then execute one
    /// instruction. Does nothing once the run flag is down.
    pub fn step(&mut self) -> Result<()> {
        if !self.cpu.regs().run() {
            return Ok(());
        }
        {
            let Bus {
                ref mut devices,
                ref mut intr,
                ..
            } = self.bus;
            let mut ctx = IoContext {
                regs: self.cpu.regs_mut(),
                intr,
            };
            devices.tick_all(&mut ctx)?;
        }
        let result = self.cpu.step(&mut self.bus);
        if let Err(ref e) = result {
            log::error!("machine fault: {}", e);
            self.cpu.dump_registers();
            self.cpu.regs_mut().set_run(false);
        } else {
            self.instructions += 1;
        }
        result
    }

    /// Run until HLT or until `limit` instructions have executed;
    /// returns the number executed
    pub fn run(&mut self, limit: u64) -> Result<u64> {
        let start = self.instructions;
        while self.cpu.regs().run() && self.instructions - start < limit {
            self.step()?;
        }
        Ok(self.instructions - start)
    }

    /// Front-panel CLEAR: AC, link, the extension and interrupt
    /// hardware all clear; core memory and the PC survive
    pub fn reset(&mut self) {
        self.cpu.regs_mut().set_ac(0);
        self.cpu.regs_mut().set_link(false);
        self.bus.reset();
    }

    // Front-panel observers and controls

    pub fn pc(&self) -> u16 {
        self.cpu.regs().pc()
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.cpu.regs_mut().set_pc(pc);
    }

    pub fn ac(&self) -> u16 {
        self.cpu.regs().ac()
    }

    pub fn link(&self) -> bool {
        self.cpu.regs().link()
    }

    pub fn halted(&self) -> bool {
        !self.cpu.regs().run()
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Set the console switch register
    pub fn set_switches(&mut self, sr: u16) {
        self.cpu.regs_mut().set_sr(sr);
    }

    /// Deposit one word, front-panel style (extended address)
    pub fn deposit(&mut self, addr: usize, word: u16) {
        self.bus.memory.write(addr, word);
    }

    /// Examine one word
    pub fn examine(&self, addr: usize) -> u16 {
        self.bus.memory.read(addr)
    }

    /// Snapshot the machine into a core image
    pub fn capture_image(&self) -> CoreImage {
        CoreImage::capture(&self.cpu, &self.bus, self.instructions)
    }

    /// Restore a previously captured image
    pub fn restore_image(&mut self, image: &CoreImage) -> Result<()> {
        self.instructions = image.apply(&mut self.cpu, &mut self.bus)?;
        log::info!("core image restored, PC={:04o}", self.pc());
        Ok(())
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }
}

#[cfg(test)]
mod tests;
