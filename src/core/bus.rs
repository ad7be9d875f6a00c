// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! The shared bus context
//!
//! Everything the CPU core sees outside its own register file: core
//! memory, the memory-extension unit, the interrupt controller and the
//! device registry, owned together as one explicit context object.
//! There is no process-wide machine state; every emulator instance has
//! its own bus, which is what makes several independent machines in one
//! process (and deterministic unit tests) possible.

use super::devices::DeviceRegistry;
use super::interrupt::InterruptController;
use super::memext::MemoryExtension;
use super::memory::Memory;

/// Bus lines shared by the processor and its peripherals
pub struct Bus {
    pub memory: Memory,
    pub ext: MemoryExtension,
    pub intr: InterruptController,
    pub devices: DeviceRegistry,
}

impl Bus {
    /// Build the bus; `extended_memory` fixes the address space size
    /// (4096 or 32768 words) for the life of the machine
    pub fn new(extended_memory: bool) -> Self {
        Self {
            memory: Memory::new(extended_memory),
            ext: MemoryExtension::new(extended_memory),
            intr: InterruptController::new(),
            devices: DeviceRegistry::new(),
        }
    }

    /// Power-cycle everything except installed devices and core memory
    ///
    /// Core survives a front-panel reset on a real machine (it is
    /// magnetic); devices get the io_reset pulse separately so request
    /// accounting stays paired.
    pub fn reset(&mut self) {
        self.ext.reset();
        self.intr.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_sizes_follow_option() {
        assert_eq!(Bus::new(false).memory.len(), 4096);
        let bus = Bus::new(true);
        assert_eq!(bus.memory.len(), 32768);
        assert!(bus.ext.present());
    }

    #[test]
    fn test_reset_preserves_core() {
        let mut bus = Bus::new(false);
        bus.memory.write(0o200, 0o7402);
        bus.intr.request_posted();
        bus.reset();
        assert_eq!(bus.memory.read(0o200), 0o7402);
        assert_eq!(bus.intr.requests(), 0);
    }
}
