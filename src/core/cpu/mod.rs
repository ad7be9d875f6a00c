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

//! KK8E central processor
//!
//! Fetch/decode/execute for the PDP-8/E instruction set: the six
//! memory-reference instructions, the three operate groups and IOT.
//! Interrupt acceptance, the deferred-enable commit and device polling
//! all happen strictly between instructions; nothing is ever
//! interleaved within one instruction's effects, which is this
//! emulator's substitute for cycle-level bus timing.
//!
//! ## Instruction format
//!
//! ```text
//! bits 0-2   opcode: AND TAD ISZ DCA JMS JMP IOT OPR
//! bit  3     indirect (memory reference) / group select (OPR)
//! bit  4     current page (memory reference)
//! bits 5-11  page address
//! ```
//!
//! ## References
//!
//! - PDP-8/E Small Computer Handbook, Digital Equipment Corporation, 1971

use bitflags::bitflags;

use super::bus::Bus;
use super::devices::IoContext;
use super::error::Result;
use super::registers::{RegisterFile, LINK_BIT, WORD_MASK};

/// Opcodes, bits 0-2 of the instruction word
const OP_AND: u16 = 0;
const OP_TAD: u16 = 1;
const OP_ISZ: u16 = 2;
const OP_DCA: u16 = 3;
const OP_JMS: u16 = 4;
const OP_JMP: u16 = 5;
const OP_IOT: u16 = 6;

/// Indirect addressing bit
const BIT_INDIRECT: u16 = 0o400;
/// Current-page bit
const BIT_PAGE: u16 = 0o200;
/// Page-relative address bits
const PAGE_ADDR: u16 = 0o177;
/// Page number bits of an address
const PAGE_MASK: u16 = 0o7600;

/// Auto-index locations: indirection through 0010-0017 increments the
/// pointer word before use
const AUTOINDEX_FIRST: u16 = 0o10;
const AUTOINDEX_LAST: u16 = 0o17;

/// Interrupt vector: PC saved at 00000, execution resumes at 00001
const INTERRUPT_SAVE: usize = 0o0;
const INTERRUPT_VECTOR: u16 = 0o1;

bitflags! {
    /// Operate group 2 microinstruction bits
    struct Group2: u16 {
        const CLA = 0o200;
        const SMA = 0o100;
        const SZA = 0o040;
        const SNL = 0o020;
        /// Reverse skip sense: SMA/SZA/SNL become SPA/SNA/SZL
        const RSS = 0o010;
        const OSR = 0o004;
        const HLT = 0o002;
    }
}

/// PDP-8/E processor
///
/// Owns the register file; everything else it touches arrives through
/// the [`Bus`].
///
/// # Example
/// ```
/// use pdp8e::core::bus::Bus;
/// use pdp8e::core::cpu::Cpu;
///
/// let mut cpu = Cpu::new();
/// let mut bus = Bus::new(false);
/// bus.memory.write(0o200, 0o7001); // IAC
/// cpu.regs_mut().set_pc(0o200);
/// cpu.regs_mut().set_run(true);
/// cpu.step(&mut bus).unwrap();
/// assert_eq!(cpu.regs().ac(), 1);
/// ```
pub struct Cpu {
    regs: RegisterFile,
}

impl Cpu {
    /// Create a CPU in the power-up state (everything zero, halted)
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
        }
    }

    /// Reset the register file to the power-up state
    pub fn reset(&mut self) {
        self.regs.reset();
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Execute one instruction
    ///
    /// Instruction-boundary work happens first: a pending interrupt is
    /// accepted if the controller allows it, then a deferred enable is
    /// committed. Committing after the acceptance check is what makes
    /// ION effective only after the *following* instruction completes.
    ///
    /// # Errors
    ///
    /// Propagates fatal bus faults (dispatch to an unregistered unit,
    /// request-counter underflow). The caller halts and dumps state;
    /// these are never recoverable.
    pub fn step(&mut self, bus: &mut Bus) -> Result<()> {
        if bus.intr.acceptable() {
            self.take_interrupt(bus)?;
        }
        bus.intr.commit_deferred_enable();

        let pc = self.regs.pc();
        let fetch_addr = bus.ext.instruction_address(pc);
        let word = bus.memory.read(fetch_addr);
        self.regs.set_cpma(pc);
        self.regs.set_mb(word);
        self.regs.set_pc(pc.wrapping_add(1));

        match word >> 9 {
            OP_AND => {
                let addr = self.operand_address(word, bus);
                let ac = self.regs.ac();
                self.regs.set_ac(ac & bus.memory.read(addr));
            }
            OP_TAD => {
                let addr = self.operand_address(word, bus);
                // 13-bit add; carry out of AC complements the link
                let sum = self.regs.ac_link().wrapping_add(bus.memory.read(addr));
                self.regs.set_ac_link(sum);
            }
            OP_ISZ => {
                let addr = self.operand_address(word, bus);
                let value = bus.memory.read(addr).wrapping_add(1) & WORD_MASK;
                bus.memory.write(addr, value);
                self.regs.set_mb(value);
                if value == 0 {
                    let pc = self.regs.pc();
                    self.regs.set_pc(pc.wrapping_add(1));
                }
            }
            OP_DCA => {
                let addr = self.operand_address(word, bus);
                bus.memory.write(addr, self.regs.ac());
                self.regs.set_ac(0);
            }
            OP_JMS => {
                let target = self.branch_target(word, bus);
                self.promote_fields(bus)?;
                let addr = bus.ext.instruction_address(target);
                bus.memory.write(addr, self.regs.pc());
                self.regs.set_pc(target.wrapping_add(1));
            }
            OP_JMP => {
                let target = self.branch_target(word, bus);
                self.promote_fields(bus)?;
                self.regs.set_pc(target);
            }
            OP_IOT => self.execute_iot(word, bus)?,
            _ => self.execute_operate(word, bus)?,
        }
        Ok(())
    }

    /// Accept a pending interrupt at the instruction boundary
    ///
    /// Saves the return PC at location 0 of field 0, captures banking
    /// context in the save field register, disables interrupts and
    /// resumes at location 1.
    fn take_interrupt(&mut self, bus: &mut Bus) -> Result<()> {
        log::debug!("interrupt accepted, PC={:04o}", self.regs.pc());
        bus.memory.write(INTERRUPT_SAVE, self.regs.pc());
        bus.ext.on_interrupt_entry();
        bus.intr.disable();
        self.regs.set_pc(INTERRUPT_VECTOR);
        Ok(())
    }

    /// Promote buffered field/user-mode state at a JMP or JMS
    fn promote_fields(&mut self, bus: &mut Bus) -> Result<()> {
        if bus.ext.on_branch_or_call() {
            // The user-interrupt request follows its flag down
            bus.intr.request_withdrawn()?;
        }
        Ok(())
    }

    /// 12-bit page/zero-page address of a memory-reference instruction
    fn page_address(&self, word: u16) -> u16 {
        let page = if word & BIT_PAGE != 0 {
            self.regs.cpma() & PAGE_MASK
        } else {
            0
        };
        page | (word & PAGE_ADDR)
    }

    /// Resolve one level of indirection, with auto-indexing
    ///
    /// The pointer word lives in the instruction field; locations
    /// 0010-0017 increment before use.
    fn resolve_indirect(&mut self, ea: u16, bus: &mut Bus) -> u16 {
        let ptr_addr = bus.ext.instruction_address(ea);
        if (AUTOINDEX_FIRST..=AUTOINDEX_LAST).contains(&ea) {
            let value = bus.memory.read(ptr_addr).wrapping_add(1) & WORD_MASK;
            bus.memory.write(ptr_addr, value);
            value
        } else {
            bus.memory.read(ptr_addr)
        }
    }

    /// Extended operand address for AND/TAD/ISZ/DCA
    ///
    /// Direct operands live in the instruction field; the final access
    /// of an indirect reference goes through the data field.
    fn operand_address(&mut self, word: u16, bus: &mut Bus) -> usize {
        let ea = self.page_address(word);
        if word & BIT_INDIRECT != 0 {
            let target = self.resolve_indirect(ea, bus);
            bus.ext.data_address(target)
        } else {
            bus.ext.instruction_address(ea)
        }
    }

    /// 12-bit JMP/JMS target
    ///
    /// Resolved entirely in the (old) instruction field; the caller
    /// promotes the buffers before the transfer itself.
    fn branch_target(&mut self, word: u16, bus: &mut Bus) -> u16 {
        let ea = self.page_address(word);
        if word & BIT_INDIRECT != 0 {
            self.resolve_indirect(ea, bus)
        } else {
            ea
        }
    }

    /// IOT: unit 0 is the processor's own set, units 20-27 belong to
    /// the memory extension when installed, everything else goes to the
    /// device registry
    fn execute_iot(&mut self, word: u16, bus: &mut Bus) -> Result<()> {
        // IOT is privileged; in user mode it traps instead of executing
        if bus.ext.user_mode() {
            self.user_trap(bus);
            return Ok(());
        }

        let unit = ((word >> 3) & 0o77) as u8;
        match unit {
            0 => self.processor_iot(word, bus),
            super::memext::UNIT_BASE..=super::memext::UNIT_LAST if bus.ext.present() => {
                self.memext_iot(word, bus)
            }
            _ => {
                let Bus {
                    ref mut devices,
                    ref mut intr,
                    ..
                } = *bus;
                let mut ctx = IoContext {
                    regs: &mut self.regs,
                    intr,
                };
                devices.dispatch(unit, word, &mut ctx)
            }
        }
    }

    /// Privileged instruction in user mode: raise the user interrupt
    /// flag and post one request for it
    fn user_trap(&mut self, bus: &mut Bus) {
        log::trace!("privileged instruction trapped in user mode");
        if bus.ext.raise_user_interrupt() {
            bus.intr.request_posted();
        }
    }

    /// Processor IOTs, device code 00
    fn processor_iot(&mut self, word: u16, bus: &mut Bus) -> Result<()> {
        match word & 7 {
            0 => {
                // SKON: skip if interrupts on, then turn them off
                if bus.intr.enabled() {
                    let pc = self.regs.pc();
                    self.regs.set_pc(pc.wrapping_add(1));
                }
                bus.intr.disable();
            }
            1 => bus.intr.enable_deferred(), // ION
            2 => bus.intr.disable(),         // IOF
            3 => {
                // SRQ: skip on interrupt request
                if bus.intr.pending() {
                    let pc = self.regs.pc();
                    self.regs.set_pc(pc.wrapping_add(1));
                }
            }
            4 => {
                // GTF: LINK, IRQ, ION and the save field register
                let mut ac = bus.ext.gtf_bits();
                if self.regs.link() {
                    ac |= 0o4000;
                }
                if bus.intr.pending() {
                    ac |= 0o1000;
                }
                if bus.intr.enabled() {
                    ac |= 0o200;
                }
                self.regs.set_ac(ac);
            }
            5 => {
                // RTF: restore flags from AC, enable deferred
                let ac = self.regs.ac();
                self.regs.set_link(ac & 0o4000 != 0);
                bus.ext.restore_flags(ac);
                bus.intr.enable_deferred();
            }
            6 => {} // SGT: no EAE installed, never skips
            7 => {
                // CAF: clear AC, link, every device flag, and the
                // interrupt system
                self.regs.set_ac(0);
                self.regs.set_link(false);
                let Bus {
                    ref mut devices,
                    ref mut intr,
                    ..
                } = *bus;
                let mut ctx = IoContext {
                    regs: &mut self.regs,
                    intr,
                };
                devices.io_reset(&mut ctx)?;
                // The user interrupt flag is cleared with the rest so
                // its request does not outlive the counter reset
                let _ = bus.ext.clear_user_interrupt();
                bus.intr.reset();
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    /// KM8E IOTs, device codes 20-27 (62X1 CDF, 62X2 CIF, 62N4 group)
    fn memext_iot(&mut self, word: u16, bus: &mut Bus) -> Result<()> {
        let field = ((word >> 3) & 7) as u8;
        match word & 7 {
            1 => bus.ext.set_data_field(field), // CDF
            2 => bus.ext.set_instruction_buffer(field), // CIF
            3 => {
                // CDI: CDF and CIF combined
                bus.ext.set_data_field(field);
                bus.ext.set_instruction_buffer(field);
            }
            4 => self.memext_extended_iot(field, bus)?,
            other => log::trace!("KM8E: unimplemented pulse {}", other),
        }
        Ok(())
    }

    /// The 62N4 group: CINT RDF RIF RIB RMF SINT CUF SUF
    fn memext_extended_iot(&mut self, select: u8, bus: &mut Bus) -> Result<()> {
        match select {
            0 => {
                // CINT: clear the user interrupt flag
                if bus.ext.clear_user_interrupt() {
                    bus.intr.request_withdrawn()?;
                }
            }
            1 => {
                // RDF: read data field into AC bits 6-8
                let ac = self.regs.ac();
                self.regs
                    .set_ac(ac | (u16::from(bus.ext.data_field()) << 3));
            }
            2 => {
                // RIF
                let ac = self.regs.ac();
                self.regs
                    .set_ac(ac | (u16::from(bus.ext.instruction_field()) << 3));
            }
            3 => {
                // RIB: read the save field register
                let ac = self.regs.ac();
                self.regs.set_ac(ac | u16::from(bus.ext.save_field()));
            }
            4 => bus.ext.on_return_from_interrupt(), // RMF
            5 => {
                // SINT: skip on user interrupt flag
                if bus.ext.user_interrupt() {
                    let pc = self.regs.pc();
                    self.regs.set_pc(pc.wrapping_add(1));
                }
            }
            6 => bus.ext.set_user_buffer(false), // CUF
            7 => bus.ext.set_user_buffer(true),  // SUF
            _ => unreachable!(),
        }
        Ok(())
    }

    /// The three operate groups
    fn execute_operate(&mut self, word: u16, bus: &mut Bus) -> Result<()> {
        if word & 0o400 == 0 {
            self.operate_group1(word);
        } else if word & 1 == 0 {
            self.operate_group2(word, bus);
        } else {
            self.operate_group3(word);
        }
        Ok(())
    }

    /// Group 1: CLA CLL CMA CML IAC and the rotates, in handbook order
    fn operate_group1(&mut self, word: u16) {
        if word & 0o200 != 0 {
            self.regs.set_ac(0); // CLA
        }
        if word & 0o100 != 0 {
            self.regs.set_link(false); // CLL
        }
        if word & 0o40 != 0 {
            let ac = self.regs.ac();
            self.regs.set_ac(!ac); // CMA (set_ac masks)
        }
        if word & 0o20 != 0 {
            let link = self.regs.link();
            self.regs.set_link(!link); // CML
        }
        if word & 1 != 0 {
            // IAC: increment the combined AC+L unit
            let sum = self.regs.ac_link().wrapping_add(1);
            self.regs.set_ac_link(sum);
        }

        let twice = word & 0o2 != 0;
        if word & 0o10 != 0 {
            // RAR / RTR
            for _ in 0..if twice { 2 } else { 1 } {
                let v = self.regs.ac_link();
                self.regs.set_ac_link((v >> 1) | ((v & 1) << 12));
            }
        } else if word & 0o4 != 0 {
            // RAL / RTL
            for _ in 0..if twice { 2 } else { 1 } {
                let v = self.regs.ac_link();
                self.regs
                    .set_ac_link(((v << 1) | ((v & LINK_BIT) >> 12)) & 0o17777);
            }
        } else if twice {
            // BSW: swap the six-bit halves of AC, link untouched
            let ac = self.regs.ac();
            self.regs.set_ac(((ac & 0o77) << 6) | (ac >> 6));
        }
    }

    /// Group 2: skip sensing, then CLA, OSR, HLT
    ///
    /// OSR and HLT are privileged; in user mode they trap through the
    /// user interrupt flag and the rest of the word still executes.
    fn operate_group2(&mut self, word: u16, bus: &mut Bus) {
        let bits = Group2::from_bits_truncate(word);

        let mut skip = (bits.contains(Group2::SMA) && self.regs.ac() & 0o4000 != 0)
            || (bits.contains(Group2::SZA) && self.regs.ac() == 0)
            || (bits.contains(Group2::SNL) && self.regs.link());
        if bits.contains(Group2::RSS) {
            skip = !skip;
        }
        if skip {
            let pc = self.regs.pc();
            self.regs.set_pc(pc.wrapping_add(1));
        }

        if bits.contains(Group2::CLA) {
            self.regs.set_ac(0);
        }

        if bits.contains(Group2::OSR) {
            if bus.ext.user_mode() {
                self.user_trap(bus);
            } else {
                let ac = self.regs.ac();
                self.regs.set_ac(ac | self.regs.sr());
            }
        }

        if bits.contains(Group2::HLT) {
            if bus.ext.user_mode() {
                self.user_trap(bus);
            } else {
                log::info!("HLT at PC={:04o}", self.regs.cpma());
                self.regs.set_run(false);
            }
        }
    }

    /// Group 3: MQ transfers (no EAE, so only CLA MQA MQL)
    fn operate_group3(&mut self, word: u16) {
        if word & 0o200 != 0 {
            self.regs.set_ac(0); // CLA
        }
        let mq = self.regs.mq();
        if word & 0o20 != 0 {
            // MQL
            self.regs.set_mq(self.regs.ac());
            self.regs.set_ac(0);
        }
        if word & 0o100 != 0 {
            // MQA; together with MQL this swaps AC and MQ
            let ac = self.regs.ac();
            self.regs.set_ac(ac | mq);
        }
    }

    /// Octal register dump for fatal-error diagnostics
    pub fn dump_registers(&self) {
        log::error!(
            "PC={:04o} AC={:04o} L={} MQ={:04o} SR={:04o} CPMA={:04o} MB={:04o} RUN={}",
            self.regs.pc(),
            self.regs.ac(),
            u8::from(self.regs.link()),
            self.regs.mq(),
            self.regs.sr(),
            self.regs.cpma(),
            self.regs.mb(),
            u8::from(self.regs.run()),
        );
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
