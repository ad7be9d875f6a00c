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

//! PC8E paper tape reader and punch
//!
//! The mountable device: the reader side (unit 01) consumes a tape
//! image file byte by byte, the punch side (unit 02) appends to one.
//! An unmounted or unreadable tape never crashes the machine; the
//! device logs a warning and keeps answering not-ready (the flag
//! simply never comes up).
//!
//! ## IOT set
//!
//! ```text
//! 6011 RSF  skip if reader flag
//! 6012 RRB  OR reader buffer into AC, clear flag
//! 6014 RFC  fetch the next tape character, flag set when ready
//! 6016 RRB + RFC combined
//! 6021 PSF  skip if punch flag
//! 6022 PCF  clear punch flag
//! 6024 PPC  punch AC bits 4-11
//! 6026 PLS  PCF + PPC, flag set when done
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use super::super::error::{DeviceError, Result};
use super::{Device, IoContext};

/// Reader-side unit code
pub const READER_UNIT: u8 = 0o01;
/// Punch-side unit code
pub const PUNCH_UNIT: u8 = 0o02;

const UNITS: [u8; 2] = [READER_UNIT, PUNCH_UNIT];

/// Paper tape reader/punch pair
pub struct PaperTape {
    reader: Option<BufReader<File>>,
    /// Reader character ready
    rd_flag: bool,
    rd_buffer: u16,
    /// Only warn once per not-ready condition
    rd_warned: bool,
    punch: Option<File>,
    /// Punch done
    pu_flag: bool,
}

impl PaperTape {
    pub fn new() -> Self {
        Self {
            reader: None,
            rd_flag: false,
            rd_buffer: 0,
            rd_warned: false,
            punch: None,
            pu_flag: false,
        }
    }

    fn raise_reader_flag(&mut self, ctx: &mut IoContext) {
        if !self.rd_flag {
            self.rd_flag = true;
            ctx.intr.request_posted();
        }
    }

    fn clear_reader_flag(&mut self, ctx: &mut IoContext) -> Result<()> {
        if self.rd_flag {
            self.rd_flag = false;
            ctx.intr.request_withdrawn()?;
        }
        Ok(())
    }

    fn raise_punch_flag(&mut self, ctx: &mut IoContext) {
        if !self.pu_flag {
            self.pu_flag = true;
            ctx.intr.request_posted();
        }
    }

    fn clear_punch_flag(&mut self, ctx: &mut IoContext) -> Result<()> {
        if self.pu_flag {
            self.pu_flag = false;
            ctx.intr.request_withdrawn()?;
        }
        Ok(())
    }

    /// Fetch the next tape byte; not-ready on no tape, end of tape, or
    /// a read error (contained, warned once)
    fn fetch(&mut self, ctx: &mut IoContext) -> Result<()> {
        self.clear_reader_flag(ctx)?;

        let Some(reader) = self.reader.as_mut() else {
            if !self.rd_warned {
                log::warn!("PC8E reader: no tape mounted, unit not ready");
                self.rd_warned = true;
            }
            return Ok(());
        };

        let mut byte = [0u8; 1];
        match reader.read(&mut byte) {
            Ok(1) => {
                self.rd_buffer = u16::from(byte[0]);
                self.rd_warned = false;
                self.raise_reader_flag(ctx);
            }
            Ok(_) => {
                if !self.rd_warned {
                    log::warn!("PC8E reader: end of tape");
                    self.rd_warned = true;
                }
            }
            Err(e) => {
                if !self.rd_warned {
                    log::warn!("PC8E reader: {}", DeviceError::ReadFailed(e.to_string()));
                    self.rd_warned = true;
                }
            }
        }
        Ok(())
    }

    fn punch_char(&mut self, ch: u8) {
        if let Some(punch) = self.punch.as_mut() {
            if let Err(e) = punch.write_all(&[ch]) {
                log::warn!("PC8E punch: write failed: {}", e);
            }
        } else {
            log::warn!("PC8E punch: no tape mounted, character lost");
        }
    }

    fn reader_iot(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        match word & 7 {
            1 => {
                // RSF
                if self.rd_flag {
                    ctx.skip();
                }
            }
            2 => {
                // RRB
                let ac = ctx.regs.ac();
                ctx.regs.set_ac(ac | self.rd_buffer);
                self.clear_reader_flag(ctx)?;
            }
            4 => self.fetch(ctx)?, // RFC
            6 => {
                // RRB + RFC
                let ac = ctx.regs.ac();
                ctx.regs.set_ac(ac | self.rd_buffer);
                self.fetch(ctx)?;
            }
            other => log::trace!("PC8E reader: unimplemented pulse {}", other),
        }
        Ok(())
    }

    fn punch_iot(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        match word & 7 {
            1 => {
                // PSF
                if self.pu_flag {
                    ctx.skip();
                }
            }
            2 => self.clear_punch_flag(ctx)?, // PCF
            4 => {
                // PPC
                self.punch_char((ctx.regs.ac() & 0o377) as u8);
                self.raise_punch_flag(ctx);
            }
            6 => {
                // PLS
                self.clear_punch_flag(ctx)?;
                self.punch_char((ctx.regs.ac() & 0o377) as u8);
                self.raise_punch_flag(ctx);
            }
            other => log::trace!("PC8E punch: unimplemented pulse {}", other),
        }
        Ok(())
    }
}

impl Default for PaperTape {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for PaperTape {
    fn units(&self) -> &[u8] {
        &UNITS
    }

    fn name(&self) -> &str {
        "ptr"
    }

    fn unit_for_name(&self, name: &str) -> Option<u8> {
        match name {
            "ptr" => Some(READER_UNIT),
            "ptp" => Some(PUNCH_UNIT),
            _ => None,
        }
    }

    fn label(&self) -> &str {
        "PC8E"
    }

    fn mount(&mut self, unit: u8, path: &Path) -> std::result::Result<(), DeviceError> {
        match unit {
            READER_UNIT => {
                let file = File::open(path).map_err(|e| DeviceError::OpenFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                self.reader = Some(BufReader::new(file));
                self.rd_warned = false;
                Ok(())
            }
            PUNCH_UNIT => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| DeviceError::OpenFailed {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                self.punch = Some(file);
                Ok(())
            }
            other => Err(DeviceError::WrongUnit {
                label: self.label().to_string(),
                unit: other,
            }),
        }
    }

    fn dispatch(&mut self, word: u16, ctx: &mut IoContext) -> Result<()> {
        match ((word >> 3) & 0o77) as u8 {
            READER_UNIT => self.reader_iot(word, ctx),
            _ => self.punch_iot(word, ctx),
        }
    }

    fn power_up(&mut self) -> Result<()> {
        log::debug!("PC8E paper tape reader/punch on line");
        Ok(())
    }

    fn power_down(&mut self) {
        // Flush the punch; dropping the handle twice is harmless
        if let Some(punch) = self.punch.as_mut() {
            let _ = punch.flush();
        }
    }

    fn io_reset(&mut self, ctx: &mut IoContext) -> Result<()> {
        self.clear_reader_flag(ctx)?;
        self.clear_punch_flag(ctx)
    }
}
