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

//! PDP-8/E register file
//!
//! Holds the processor's architectural state: everything visible outside
//! the CPU proper, either to an I/O device or to the front panel. Every
//! 12-bit field is masked on write, so a stored value is always in
//! `0..=0o7777` no matter what the caller passes in. The link bit is
//! logically separate from the accumulator but arithmetically adjacent:
//! TAD, IAC and the rotate microinstructions treat AC+L as one 13-bit
//! unit, which [`RegisterFile::ac_link`] / [`RegisterFile::set_ac_link`]
//! expose directly.
//!
//! This is pure shared state with no behavior of its own. It is mutated
//! every instruction cycle by the CPU core and read by devices through
//! the I/O context.

/// Mask for a 12-bit PDP-8 word
pub const WORD_MASK: u16 = 0o7777;

/// Bit position of the link in the combined AC+L unit
pub const LINK_BIT: u16 = 0o10000;

/// Generally visible processor registers
///
/// # Example
/// ```
/// use pdp8e::core::registers::RegisterFile;
///
/// let mut regs = RegisterFile::new();
/// regs.set_ac(0o12345); // oversized, masked to 12 bits
/// assert_eq!(regs.ac(), 0o2345);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegisterFile {
    /// Accumulator, 12 bits
    ac: u16,
    /// Program counter, 12 bits
    pc: u16,
    /// Multiplier quotient, 12 bits
    mq: u16,
    /// Switch register (front panel), 12 bits
    sr: u16,
    /// Central processor memory address register
    cpma: u16,
    /// Memory buffer register
    mb: u16,
    /// Link bit
    link: bool,
    /// Run flipflop, false = halt, true = running
    run: bool,
}

impl RegisterFile {
    /// Create a register file in the power-up state (all zero, halted)
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to the power-up state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline(always)]
    pub fn ac(&self) -> u16 {
        self.ac
    }

    #[inline(always)]
    pub fn set_ac(&mut self, value: u16) {
        self.ac = value & WORD_MASK;
    }

    #[inline(always)]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline(always)]
    pub fn set_pc(&mut self, value: u16) {
        self.pc = value & WORD_MASK;
    }

    #[inline(always)]
    pub fn mq(&self) -> u16 {
        self.mq
    }

    #[inline(always)]
    pub fn set_mq(&mut self, value: u16) {
        self.mq = value & WORD_MASK;
    }

    #[inline(always)]
    pub fn sr(&self) -> u16 {
        self.sr
    }

    #[inline(always)]
    pub fn set_sr(&mut self, value: u16) {
        self.sr = value & WORD_MASK;
    }

    #[inline(always)]
    pub fn cpma(&self) -> u16 {
        self.cpma
    }

    #[inline(always)]
    pub fn set_cpma(&mut self, value: u16) {
        self.cpma = value & WORD_MASK;
    }

    #[inline(always)]
    pub fn mb(&self) -> u16 {
        self.mb
    }

    #[inline(always)]
    pub fn set_mb(&mut self, value: u16) {
        self.mb = value & WORD_MASK;
    }

    #[inline(always)]
    pub fn link(&self) -> bool {
        self.link
    }

    #[inline(always)]
    pub fn set_link(&mut self, value: bool) {
        self.link = value;
    }

    #[inline(always)]
    pub fn run(&self) -> bool {
        self.run
    }

    #[inline(always)]
    pub fn set_run(&mut self, value: bool) {
        self.run = value;
    }

    /// Combined 13-bit AC+L unit, link in bit position `0o10000`
    ///
    /// TAD and IAC add into this unit so a carry out of AC bit 0
    /// complements the link; the rotate microinstructions rotate
    /// through it.
    #[inline(always)]
    pub fn ac_link(&self) -> u16 {
        self.ac | if self.link { LINK_BIT } else { 0 }
    }

    /// Store a 13-bit value back into AC and link
    #[inline(always)]
    pub fn set_ac_link(&mut self, value: u16) {
        self.ac = value & WORD_MASK;
        self.link = value & LINK_BIT != 0;
    }
}
