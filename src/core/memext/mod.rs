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

//! KM8E memory extension and time share option
//!
//! Banked addressing for the PDP-8/E: a 3-bit *field* selector combined
//! with a 12-bit address forms a 15-bit extended address. The field
//! registers are stored pre-shifted into bit positions 12-14 so they OR
//! directly onto a 12-bit address with no shifting on the hot path.
//!
//! Two registers select banks:
//!
//! - the **instruction field** (IF) covers instruction fetch, direct
//!   operands, indirect pointer fetch, and JMP/JMS targets;
//! - the **data field** (DF) covers the final operand access of
//!   indirectly addressed AND/TAD/ISZ/DCA.
//!
//! CIF does not change the instruction field at once; doing so would
//! tear the ground out from under the running program. It loads the
//! **instruction buffer** (IB) instead, and the buffer is promoted to IF
//! only when a JMP or JMS executes. The user-mode buffer (UB) follows
//! the same rule. Interrupt entry packs `{UF, IF, DF}` into the 7-bit
//! **save field** register and forces everything to field 0 so the
//! service routine runs in a known bank; RMF/RTF unpack it back into
//! the buffered registers for the return jump.
//!
//! When the option is absent every field register is permanently zero,
//! so address combination degrades to the identity and the machine is a
//! plain 4K PDP-8/E. Presence is fixed at configuration time and never
//! changes mid-run.
//!
//! ## References
//!
//! - PDP-8/E Small Computer Handbook, Digital Equipment Corporation, 1971

use super::registers::WORD_MASK;

/// Device codes claimed by the KM8E IOT set (62X1 CDF, 62X2 CIF, ...)
pub const UNIT_BASE: u8 = 0o20;
pub const UNIT_LAST: u8 = 0o27;

/// KM8E state: field selectors, buffers, save field, user mode
///
/// # Example
/// ```
/// use pdp8e::core::memext::MemoryExtension;
///
/// let mut ext = MemoryExtension::new(true);
/// ext.set_instruction_buffer(3);
/// // buffered until a branch or subroutine call executes
/// assert_eq!(ext.instruction_address(0o200), 0o200);
/// let _ = ext.on_branch_or_call();
/// assert_eq!(ext.instruction_address(0o200), 0o30200);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryExtension {
    /// Option installed; when false all fields stay zero
    present: bool,
    /// Instruction field register, pre-shifted into bits 12-14
    ifr: u16,
    /// Data field register, pre-shifted into bits 12-14
    dfr: u16,
    /// Instruction field buffer, pre-shifted; copied to IF on branch/JMS
    ib: u16,
    /// Save field register, 7 bits: UF<<6 | IF<<3 | DF
    sf: u8,
    /// User mode flag
    uf: bool,
    /// User mode buffer; copied to UF on branch/JMS
    ub: bool,
    /// User interrupt flag; set by privileged traps, reset on branch/JMS
    uif: bool,
}

impl MemoryExtension {
    /// Create the unit; `present` selects whether the option is installed
    pub fn new(present: bool) -> Self {
        Self {
            present,
            ifr: 0,
            dfr: 0,
            ib: 0,
            sf: 0,
            uf: false,
            ub: false,
            uif: false,
        }
    }

    /// True iff the option is installed
    pub fn present(&self) -> bool {
        self.present
    }

    /// Reset to the power-up state, keeping the option setting
    pub fn reset(&mut self) {
        let present = self.present;
        *self = Self::new(present);
    }

    /// Extended address for an instruction-side access
    ///
    /// Instruction fetch, direct operands, indirect pointer words and
    /// JMP/JMS targets all combine with the instruction field.
    #[inline(always)]
    pub fn instruction_address(&self, addr: u16) -> usize {
        (self.ifr | (addr & WORD_MASK)) as usize
    }

    /// Extended address for the operand of an indirect AND/TAD/ISZ/DCA
    #[inline(always)]
    pub fn data_address(&self, addr: u16) -> usize {
        (self.dfr | (addr & WORD_MASK)) as usize
    }

    /// Active instruction field, 0-7
    pub fn instruction_field(&self) -> u8 {
        (self.ifr >> 12) as u8
    }

    /// Active data field, 0-7
    pub fn data_field(&self) -> u8 {
        (self.dfr >> 12) as u8
    }

    /// Buffered instruction field, 0-7
    pub fn instruction_buffer(&self) -> u8 {
        (self.ib >> 12) as u8
    }

    /// Save field register, 7 bits
    pub fn save_field(&self) -> u8 {
        self.sf
    }

    /// Load the data field register (CDF), effective immediately
    pub fn set_data_field(&mut self, field: u8) {
        self.dfr = u16::from(field & 7) << 12;
    }

    /// Load the instruction field buffer (CIF)
    ///
    /// Takes effect at the next branch or subroutine call, never on a
    /// straight-line instruction.
    pub fn set_instruction_buffer(&mut self, field: u8) {
        self.ib = u16::from(field & 7) << 12;
    }

    /// Load the user mode buffer (SUF/CUF)
    pub fn set_user_buffer(&mut self, user: bool) {
        self.ub = user;
    }

    /// User mode flag
    pub fn user_mode(&self) -> bool {
        self.uf
    }

    /// User mode buffer
    pub fn user_buffer(&self) -> bool {
        self.ub
    }

    /// User interrupt flag
    pub fn user_interrupt(&self) -> bool {
        self.uif
    }

    /// Raise the user interrupt flag (privileged instruction trap)
    ///
    /// Returns true if the flag was newly raised, so the caller posts
    /// exactly one interrupt request per trap.
    pub fn raise_user_interrupt(&mut self) -> bool {
        let newly = !self.uif;
        self.uif = true;
        newly
    }

    /// Clear the user interrupt flag (CINT)
    ///
    /// Returns true if the flag was set, so the caller withdraws the
    /// matching interrupt request.
    pub fn clear_user_interrupt(&mut self) -> bool {
        let was = self.uif;
        self.uif = false;
        was
    }

    /// Promote buffered state at a control-transfer boundary (JMP, JMS)
    ///
    /// Atomically copies IB to IF and UB to UF, and clears the user
    /// interrupt flag. Field and mode switches take effect only here,
    /// never on straight-line instructions. Returns true if the user
    /// interrupt flag was set, so the caller withdraws its request.
    #[must_use]
    pub fn on_branch_or_call(&mut self) -> bool {
        self.ifr = self.ib;
        self.uf = self.ub;
        let uif_was_set = self.uif;
        self.uif = false;
        uif_was_set
    }

    /// Capture banking context at interrupt entry
    ///
    /// Packs `{UF, IF, DF}` into the save field register and forces the
    /// instruction field, its buffer, the data field and user mode to
    /// zero, so the service routine starts in field 0 in executive mode.
    /// Runs only between instructions; the caller also disables the
    /// interrupt controller.
    pub fn on_interrupt_entry(&mut self) {
        self.sf = (u8::from(self.uf) << 6) | (self.instruction_field() << 3) | self.data_field();
        self.ifr = 0;
        self.ib = 0;
        self.dfr = 0;
        self.uf = false;
        self.ub = false;
        log::debug!("interrupt entry, SF={:03o}", self.sf);
    }

    /// Unpack the save field register (RMF)
    ///
    /// The data field is restored at once; the instruction field and
    /// user mode go to their buffers and take effect at the return
    /// jump. Interrupt re-enable is the controller's deferred enable,
    /// not done here.
    pub fn on_return_from_interrupt(&mut self) {
        self.dfr = u16::from(self.sf & 7) << 12;
        self.ib = u16::from((self.sf >> 3) & 7) << 12;
        self.ub = self.sf & 0o100 != 0;
    }

    /// Restore field state from AC bits 5-11 (RTF)
    ///
    /// Same layout as the save field register: UB from bit 5, IB from
    /// bits 6-8, DF from bits 9-11.
    pub fn restore_flags(&mut self, ac: u16) {
        self.dfr = (ac & 7) << 12;
        self.ib = ((ac >> 3) & 7) << 12;
        self.ub = ac & 0o100 != 0;
    }

    /// Save field register widened for GTF's AC bits 5-11
    ///
    /// GTF reads SF, not the live fields: executed inside a service
    /// routine (where the live fields are forced to 0) it must deliver
    /// the pre-interrupt context so the GTF/RTF pair round-trips.
    pub fn gtf_bits(&self) -> u16 {
        u16::from(self.sf)
    }

    /// Restore from a core image
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        &mut self,
        ifr: u16,
        dfr: u16,
        ib: u16,
        sf: u8,
        uf: bool,
        ub: bool,
        uif: bool,
    ) {
        self.ifr = ifr & 0o70000;
        self.dfr = dfr & 0o70000;
        self.ib = ib & 0o70000;
        self.sf = sf & 0o177;
        self.uf = uf;
        self.ub = ub;
        self.uif = uif;
    }

    /// Raw pre-shifted registers, for core-image capture
    pub(crate) fn raw(&self) -> (u16, u16, u16) {
        (self.ifr, self.dfr, self.ib)
    }
}

#[cfg(test)]
mod tests;
