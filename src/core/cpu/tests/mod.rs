// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

use super::*;
use crate::core::bus::Bus;

mod operate;

/// CPU plus a bus without memory extension, ready to run at 0200
fn machine() -> (Cpu, Bus) {
    let mut cpu = Cpu::new();
    let bus = Bus::new(false);
    cpu.regs_mut().set_pc(0o200);
    cpu.regs_mut().set_run(true);
    (cpu, bus)
}

/// Same but with the KM8E installed (32K memory)
fn extended_machine() -> (Cpu, Bus) {
    let mut cpu = Cpu::new();
    let bus = Bus::new(true);
    cpu.regs_mut().set_pc(0o200);
    cpu.regs_mut().set_run(true);
    (cpu, bus)
}

/// Load a program at `origin` and point the PC at it
fn load(bus: &mut Bus, origin: usize, words: &[u16]) {
    for (i, &w) in words.iter().enumerate() {
        bus.memory.write(origin + i, w);
    }
}
