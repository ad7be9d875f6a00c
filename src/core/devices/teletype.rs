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

//! KL8E console teletype interface
//!
//! Two units on one device: 03 is the keyboard side, 04 the printer
//! side. Each side has a one-character buffer and a ready flag; a
//! raised flag holds the interrupt request line, so the flag edges are
//! paired with request posts and withdrawals.
//!
//! ## IOT set
//!
//! ```text
//! 6030 KCF  clear keyboard flag
//! 6031 KSF  skip if keyboard flag
//! 6032 KCC  clear keyboard flag and AC
//! 6034 KRS  OR keyboard buffer into AC
//! 6036 KRB  KCC + KRS
//! 6040 TFL  set printer flag
//! 6041 TSF  skip if printer flag
//! 6042 TCF  clear printer flag
//! 6044 TPC  print AC bits 4-11
//! 6046 TLS  TCF + TPC, flag set when done
//! ```
//!
//! Character transfers complete synchronously (the printer flag comes
//! up on the same dispatch), which is the emulator's substitute for the
//! real 110-baud transfer time. Input arrives through the non-blocking
//! [`Console`] poll between instructions.

use std::path::Path;

use super::super::console::Console;
use super::super::error::{DeviceError, Result};
use super::{Device, IoContext};

/// Keyboard-side unit code
pub const KEYBOARD_UNIT: u8 = 0o03;
/// Printer-side unit code
pub const PRINTER_UNIT: u8 = 0o04;

const UNITS: [u8; 2] = [KEYBOARD_UNIT, PRINTER_UNIT];

/// Console teletype, keyboard and printer sides
pub struct Teletype {
    console: Box<dyn Console>,
    /// Keyboard character ready
    kb_flag: bool,
    /// Last character read, mark bit set as on the real current loop
    kb_buffer: u16,
    /// Printer done
    pr_flag: bool,
}

impl Teletype {
    pub fn new(console: Box<dyn Console>) -> Self {
        Self {
            console,
            kb_flag: false,
            kb_buffer: 0,
            pr_flag: false,
        }
    }

    fn raise_keyboard_flag(&mut self, ctx: &mut IoContext) {
        if !self.kb_flag {
            self.kb_flag = true;
            ctx.intr.request_posted();
        }
    }

    fn clear_keyboard_flag(&mut self, ctx: &mut IoContext) -> Result<()> {
        if self.kb_flag {
            self.kb_flag = false;
            ctx.intr.request_withdrawn()?;
        }
        Ok(())
    }

    fn raise_printer_flag(&mut self, ctx: &mut IoContext) {
        if !self.pr_flag {
            self.pr_flag = true;
            ctx.intr.request_posted();
        }
    }

    fn clear_printer_flag(&mut self, ctx: &mut IoContext) -> Result<()> {
        if self.pr_flag {
            self.pr_flag = false;
            ctx.intr.request_withdrawn()?;
        }
        Ok(())
    }

    fn keyboard_iot(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        match word & 7 {
            0 => self.clear_keyboard_flag(ctx)?, // KCF
            1 => {
                // KSF
                if self.kb_flag {
                    ctx.skip();
                }
            }
            2 => {
                // KCC
                self.clear_keyboard_flag(ctx)?;
                ctx.regs.set_ac(0);
            }
            4 => {
                // KRS
                let ac = ctx.regs.ac();
                ctx.regs.set_ac(ac | self.kb_buffer);
            }
            6 => {
                // KRB
                self.clear_keyboard_flag(ctx)?;
                ctx.regs.set_ac(self.kb_buffer);
            }
            other => log::trace!("KL8E keyboard: unimplemented pulse {}", other),
        }
        Ok(())
    }

    fn printer_iot(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        match word & 7 {
            0 => self.raise_printer_flag(ctx), // TFL
            1 => {
                // TSF
                if self.pr_flag {
                    ctx.skip();
                }
            }
            2 => self.clear_printer_flag(ctx)?, // TCF
            4 => {
                // TPC
                self.console.put_char((ctx.regs.ac() & 0o177) as u8);
                self.raise_printer_flag(ctx);
            }
            6 => {
                // TLS
                self.clear_printer_flag(ctx)?;
                self.console.put_char((ctx.regs.ac() & 0o177) as u8);
                self.raise_printer_flag(ctx);
            }
            other => log::trace!("KL8E printer: unimplemented pulse {}", other),
        }
        Ok(())
    }
}

impl Device for Teletype {
    fn units(&self) -> &[u8] {
        &UNITS
    }

    fn name(&self) -> &str {
        "tty"
    }

    fn label(&self) -> &str {
        "KL8E"
    }

    fn mount(&mut self, _unit: u8, _path: &Path) -> std::result::Result<(), DeviceError> {
        // The console line is wired at construction, not mounted
        Err(DeviceError::NotMountable(self.name().to_string()))
    }

    fn dispatch(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        match ((word >> 3) & 0o77) as u8 {
            KEYBOARD_UNIT => self.keyboard_iot(word, ctx),
            _ => self.printer_iot(word, ctx),
        }
    }

    fn power_up(&mut self) -> Result<()> {
        log::debug!("KL8E console teletype on line");
        Ok(())
    }

    fn io_reset(&mut self, ctx: &mut IoContext) -> Result<()> {
        self.clear_keyboard_flag(ctx)?;
        self.clear_printer_flag(ctx)
    }

    fn tick(&mut self, ctx: &mut IoContext) -> Result<()> {
        // One character at a time: hold the poll while a character is
        // still waiting to be read
        if !self.kb_flag {
            if let Some(ch) = self.console.poll_char() {
                self.kb_buffer = u16::from(ch) | 0o200;
                self.raise_keyboard_flag(ctx);
            }
        }
        Ok(())
    }
}
