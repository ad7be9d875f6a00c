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

//! Device registry test modules
//!
//! Tests are organized into the following categories:
//! - `registry`: registration, duplicate units, dispatch routing, power
//! - `teletype`: KL8E keyboard/printer flags and transfers
//! - `papertape`: PC8E mounting and contained I/O errors

mod papertape;

use super::*;

/// Minimal device for registry tests: counts dispatches, records power
/// transitions
pub(super) struct MockDevice {
    units: Vec<u8>,
    name: &'static str,
    pub dispatched: Vec<u16>,
    pub powered_up: u32,
    pub powered_down: u32,
}

impl MockDevice {
    pub(super) fn new(name: &'static str, units: &[u8]) -> Self {
        Self {
            units: units.to_vec(),
            name,
            dispatched: Vec::new(),
            powered_up: 0,
            powered_down: 0,
        }
    }
}

impl Device for MockDevice {
    fn units(&self) -> &[u8] {
        &self.units
    }

    fn name(&self) -> &str {
        self.name
    }

    fn label(&self) -> &str {
        "MOCK"
    }

    fn dispatch(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        self.dispatched.push(word);
        // Answer every IOT with a skip so routing is observable
        ctx.skip();
        Ok(())
    }

    fn power_up(&mut self) -> Result<()> {
        self.powered_up += 1;
        Ok(())
    }

    fn power_down(&mut self) {
        self.powered_down += 1;
    }
}

/// Fresh register file and interrupt controller for a dispatch context
pub(super) fn fresh_state() -> (RegisterFile, InterruptController) {
    (RegisterFile::new(), InterruptController::new())
}
