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

//! PDP-8/E interrupt controller
//!
//! The PDP-8 has a single interrupt request line shared by every
//! peripheral. A device asserts the line by *posting* a request and
//! releases it by *withdrawing* one; requests are counted rather than
//! latched so any number of devices can hold the line at once. Any
//! positive count means "interrupt pending".
//!
//! Whether a pending request is *accepted* is gated by the enable state.
//! ION and RTF do not enable interrupts immediately: the enable takes
//! effect only after the **following** instruction completes, so a
//! program can execute ION followed by a return jump without being
//! interrupted in between. That two-phase enable is modeled by the
//! [`EnableState::DeferredEnable`] state, committed once per instruction
//! boundary by the CPU core.
//!
//! On acceptance the CPU core saves the banking context
//! ([`crate::core::memext::MemoryExtension::on_interrupt_entry`]),
//! calls [`InterruptController::disable`], stores the return PC at
//! location 0 of field 0, and resumes at location 1.
//!
//! ## References
//!
//! - PDP-8/E Small Computer Handbook, Digital Equipment Corporation, 1971

use super::error::{EmulatorError, Result};

/// Interrupt enable state
///
/// `DeferredEnable` is the one-instruction window between ION (or RTF)
/// and the enable actually taking effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableState {
    /// Interrupts off; requests accumulate but are not accepted
    Disabled,
    /// Enable requested, takes effect at the next instruction boundary
    DeferredEnable,
    /// Interrupts on
    Enabled,
}

/// Shared interrupt request line and enable logic
///
/// Only the CPU core drives the enable transitions; devices may only
/// post and withdraw requests. This is the whole write surface devices
/// have into interrupt state, which keeps request accounting consistent.
///
/// # Example
/// ```
/// use pdp8e::core::interrupt::InterruptController;
///
/// let mut intr = InterruptController::new();
/// intr.request_posted();
/// assert!(!intr.acceptable()); // still disabled
///
/// intr.enable_deferred();
/// assert!(!intr.acceptable()); // not until the commit
///
/// intr.commit_deferred_enable();
/// assert!(intr.acceptable());
/// ```
#[derive(Debug, Clone)]
pub struct InterruptController {
    /// Enable state machine
    state: EnableState,
    /// Outstanding request count; any positive value is a pending request
    requests: u32,
}

impl InterruptController {
    /// Create a controller in the power-up state: disabled, no requests
    pub fn new() -> Self {
        Self {
            state: EnableState::Disabled,
            requests: 0,
        }
    }

    /// Reset to the power-up state
    ///
    /// Used by CAF together with the device-side flag clear; devices
    /// clear their flags through [`Self::request_withdrawn`] first so
    /// the count stays paired.
    pub fn reset(&mut self) {
        self.state = EnableState::Disabled;
        self.requests = 0;
    }

    /// Post one interrupt request
    ///
    /// Legal in every enable state: peripherals may interrupt regardless
    /// of the controller state, acceptance is gated separately.
    pub fn request_posted(&mut self) {
        self.requests = self.requests.saturating_add(1);
        log::trace!("IRQ posted, {} outstanding", self.requests);
    }

    /// Withdraw one previously posted request
    ///
    /// # Errors
    ///
    /// [`EmulatorError::IrqUnderflow`] if there is no outstanding request
    /// to withdraw. That can only happen when a device mispairs its
    /// posts and withdrawals, which is a bug in the emulator itself, so
    /// the caller must treat it as fatal.
    pub fn request_withdrawn(&mut self) -> Result<()> {
        if self.requests == 0 {
            log::error!("IRQ withdrawn with no outstanding request");
            return Err(EmulatorError::IrqUnderflow);
        }
        self.requests -= 1;
        log::trace!("IRQ withdrawn, {} outstanding", self.requests);
        Ok(())
    }

    /// Turn interrupts off immediately (IOF, interrupt entry)
    pub fn disable(&mut self) {
        self.state = EnableState::Disabled;
    }

    /// Request enable, deferred one instruction (ION, RTF)
    ///
    /// No effect if interrupts are already enabled.
    pub fn enable_deferred(&mut self) {
        if self.state == EnableState::Disabled {
            self.state = EnableState::DeferredEnable;
            log::debug!("interrupt enable deferred");
        }
    }

    /// Commit a deferred enable
    ///
    /// Called by the CPU core exactly once per instruction boundary,
    /// after the acceptance check, so the enable becomes effective only
    /// after the instruction following ION completes.
    pub fn commit_deferred_enable(&mut self) {
        if self.state == EnableState::DeferredEnable {
            self.state = EnableState::Enabled;
            log::debug!("interrupt enable committed");
        }
    }

    /// True iff an interrupt may be taken right now
    #[inline(always)]
    pub fn acceptable(&self) -> bool {
        self.state == EnableState::Enabled && self.requests > 0
    }

    /// True iff the enable state is `Enabled` (SKON, GTF)
    #[inline(always)]
    pub fn enabled(&self) -> bool {
        self.state == EnableState::Enabled
    }

    /// True iff any request is outstanding (SRQ, GTF)
    #[inline(always)]
    pub fn pending(&self) -> bool {
        self.requests > 0
    }

    /// Current enable state
    pub fn state(&self) -> EnableState {
        self.state
    }

    /// Outstanding request count
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Restore from a core image
    pub(crate) fn restore(&mut self, state: EnableState, requests: u32) {
        self.state = state;
        self.requests = requests;
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
