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

//! Core image persistence
//!
//! A core image is a full snapshot of the machine state: every word of
//! core memory plus the register file, the memory-extension registers
//! and the interrupt system. Images are versioned; loading an image
//! written by an incompatible build fails cleanly instead of producing
//! a machine in an impossible state.
//!
//! Device state (flags, open tapes) is deliberately not captured.
//! Real core survived a power cycle; peripherals did not.

use std::fs;
use std::path::Path;

use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bus::Bus;
use super::cpu::Cpu;
use super::error::{EmulatorError, Result};
use super::interrupt::EnableState;

/// Bump whenever the on-disk layout changes
pub const CORE_IMAGE_VERSION: u32 = 1;

#[derive(Debug, Clone, Encode, Decode, Serialize, Deserialize)]
struct RegisterSnapshot {
    ac: u16,
    pc: u16,
    mq: u16,
    sr: u16,
    cpma: u16,
    mb: u16,
    link: bool,
    run: bool,
}

#[derive(Debug, Clone, Encode, Decode, Serialize, Deserialize)]
struct MemExtSnapshot {
    present: bool,
    instruction_field: u16,
    data_field: u16,
    instruction_buffer: u16,
    save_field: u8,
    user_flag: bool,
    user_buffer: bool,
    user_interrupt: bool,
}

#[derive(Debug, Clone, Encode, Decode, Serialize, Deserialize)]
struct InterruptSnapshot {
    /// 0 disabled, 1 deferred, 2 enabled
    state: u8,
    requests: u32,
}

/// A complete, versioned machine snapshot
///
/// # Example
/// ```no_run
/// use pdp8e::core::system::{MachineConfig, System};
///
/// let mut system = System::new(MachineConfig::default());
/// let image = system.capture_image();
/// image.save_to_file("machine.core").unwrap();
/// ```
#[derive(Debug, Clone, Encode, Decode, Serialize, Deserialize)]
pub struct CoreImage {
    version: u32,
    #[bincode(with_serde)]
    saved_at: DateTime<Utc>,
    extended_memory: bool,
    memory: Vec<u16>,
    regs: RegisterSnapshot,
    ext: MemExtSnapshot,
    intr: InterruptSnapshot,
    instructions: u64,
}

impl CoreImage {
    /// Snapshot the live machine
    pub fn capture(cpu: &Cpu, bus: &Bus, instructions: u64) -> Self {
        let regs = cpu.regs();
        let (ifr, dfr, ib) = bus.ext.raw();
        Self {
            version: CORE_IMAGE_VERSION,
            saved_at: Utc::now(),
            extended_memory: bus.ext.present(),
            memory: bus.memory.words().to_vec(),
            regs: RegisterSnapshot {
                ac: regs.ac(),
                pc: regs.pc(),
                mq: regs.mq(),
                sr: regs.sr(),
                cpma: regs.cpma(),
                mb: regs.mb(),
                link: regs.link(),
                run: regs.run(),
            },
            ext: MemExtSnapshot {
                present: bus.ext.present(),
                instruction_field: ifr,
                data_field: dfr,
                instruction_buffer: ib,
                save_field: bus.ext.save_field(),
                user_flag: bus.ext.user_mode(),
                user_buffer: bus.ext.user_buffer(),
                user_interrupt: bus.ext.user_interrupt(),
            },
            intr: InterruptSnapshot {
                state: match bus.intr.state() {
                    EnableState::Disabled => 0,
                    EnableState::DeferredEnable => 1,
                    EnableState::Enabled => 2,
                },
                requests: bus.intr.requests(),
            },
            instructions,
        }
    }

    /// Write the machine state captured here back into a live machine
    ///
    /// The target must have the same memory configuration the image
    /// was taken from.
    ///
    /// # Errors
    ///
    /// [`EmulatorError::CoreImageSize`] when the image's memory does
    /// not match the target's, [`EmulatorError::CoreImageMalformed`]
    /// if a field is out of range or the image needs extended memory
    /// the target lacks. Validation runs before any state is written,
    /// so a rejected image leaves the machine untouched.
    pub fn apply(&self, cpu: &mut Cpu, bus: &mut Bus) -> Result<u64> {
        if self.memory.len() != bus.memory.len() {
            return Err(EmulatorError::CoreImageSize {
                expected: bus.memory.len(),
                got: self.memory.len(),
            });
        }
        if !bus.ext.present()
            && (self.ext.present
                || self.ext.instruction_field != 0
                || self.ext.data_field != 0
                || self.ext.instruction_buffer != 0)
        {
            // A nonzero field on a 4K machine would address core that
            // does not exist
            return Err(EmulatorError::CoreImageMalformed(
                "extension registers set but the target has no extended memory".to_string(),
            ));
        }
        let state = match self.intr.state {
            0 => EnableState::Disabled,
            1 => EnableState::DeferredEnable,
            2 => EnableState::Enabled,
            other => {
                return Err(EmulatorError::CoreImageMalformed(format!(
                    "interrupt enable state {} out of range",
                    other
                )))
            }
        };

        bus.memory.load_words(&self.memory);

        let regs = cpu.regs_mut();
        regs.set_ac(self.regs.ac);
        regs.set_pc(self.regs.pc);
        regs.set_mq(self.regs.mq);
        regs.set_sr(self.regs.sr);
        regs.set_cpma(self.regs.cpma);
        regs.set_mb(self.regs.mb);
        regs.set_link(self.regs.link);
        regs.set_run(self.regs.run);

        bus.ext.restore(
            self.ext.instruction_field,
            self.ext.data_field,
            self.ext.instruction_buffer,
            self.ext.save_field,
            self.ext.user_flag,
            self.ext.user_buffer,
            self.ext.user_interrupt,
        );
        bus.intr.restore(state, self.intr.requests);

        Ok(self.instructions)
    }

    /// True when the image was taken from a machine with the KM8E
    pub fn extended_memory(&self) -> bool {
        self.extended_memory
    }

    pub fn saved_at(&self) -> DateTime<Utc> {
        self.saved_at
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serialize to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| EmulatorError::CoreImageMalformed(e.to_string()))?;
        fs::write(path.as_ref(), bytes)?;
        log::info!(
            "core image saved to {} ({} words)",
            path.as_ref().display(),
            self.memory.len()
        );
        Ok(())
    }

    /// Read and validate an image file
    ///
    /// # Errors
    ///
    /// [`EmulatorError::CoreImageNotFound`] when the file is missing,
    /// [`EmulatorError::CoreImageMalformed`] when it does not decode,
    /// [`EmulatorError::CoreImageVersion`] on a layout mismatch.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EmulatorError::CoreImageNotFound(path.as_ref().display().to_string())
            } else {
                EmulatorError::Io(e)
            }
        })?;
        let (image, _): (Self, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| EmulatorError::CoreImageMalformed(e.to_string()))?;
        if image.version != CORE_IMAGE_VERSION {
            return Err(EmulatorError::CoreImageVersion {
                expected: CORE_IMAGE_VERSION,
                got: image.version,
            });
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_machine() -> (Cpu, Bus) {
        let mut cpu = Cpu::new();
        let mut bus = Bus::new(true);
        cpu.regs_mut().set_ac(0o1234);
        cpu.regs_mut().set_pc(0o4321);
        cpu.regs_mut().set_link(true);
        bus.memory.write(0o200, 0o7402);
        bus.memory.write((7 << 12) | 0o7777, 0o5252);
        bus.ext.set_data_field(6);
        bus.intr.request_posted();
        (cpu, bus)
    }

    #[test]
    fn round_trip_through_a_file() {
        let (cpu, bus) = sample_machine();
        let image = CoreImage::capture(&cpu, &bus, 42);

        let dir = tempdir().unwrap();
        let path = dir.path().join("machine.core");
        image.save_to_file(&path).unwrap();

        let loaded = CoreImage::load_from_file(&path).unwrap();
        let mut cpu2 = Cpu::new();
        let mut bus2 = Bus::new(true);
        let instructions = loaded.apply(&mut cpu2, &mut bus2).unwrap();

        assert_eq!(instructions, 42);
        assert_eq!(cpu2.regs().ac(), 0o1234);
        assert_eq!(cpu2.regs().pc(), 0o4321);
        assert!(cpu2.regs().link());
        assert_eq!(bus2.memory.read(0o200), 0o7402);
        assert_eq!(bus2.memory.read((7 << 12) | 0o7777), 0o5252);
        assert_eq!(bus2.ext.data_field(), 6);
        assert_eq!(bus2.intr.requests(), 1);
    }

    #[test]
    fn missing_file_is_reported_as_such() {
        let err = CoreImage::load_from_file("/no/such/machine.core").unwrap_err();
        assert!(matches!(err, EmulatorError::CoreImageNotFound(_)));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.core");
        std::fs::write(&path, b"not a core image").unwrap();
        let result = CoreImage::load_from_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let (cpu, bus) = sample_machine(); // 32K image
        let image = CoreImage::capture(&cpu, &bus, 0);
        let mut cpu2 = Cpu::new();
        let mut bus2 = Bus::new(false); // 4K target
        let err = image.apply(&mut cpu2, &mut bus2).unwrap_err();
        assert!(matches!(err, EmulatorError::CoreImageSize { .. }));
    }

    #[test]
    fn extension_fields_on_a_basic_machine_are_rejected() {
        // Hand-built image: 4K of core, so the size check passes, but
        // IF points at field 3. Letting it through would make the next
        // fetch address nonexistent core.
        let image = CoreImage {
            version: CORE_IMAGE_VERSION,
            saved_at: Utc::now(),
            extended_memory: false,
            memory: vec![0; 4096],
            regs: RegisterSnapshot {
                ac: 0,
                pc: 0o200,
                mq: 0,
                sr: 0,
                cpma: 0,
                mb: 0,
                link: false,
                run: true,
            },
            ext: MemExtSnapshot {
                present: false,
                instruction_field: 3 << 12,
                data_field: 0,
                instruction_buffer: 0,
                save_field: 0,
                user_flag: false,
                user_buffer: false,
                user_interrupt: false,
            },
            intr: InterruptSnapshot {
                state: 0,
                requests: 0,
            },
            instructions: 0,
        };

        let mut cpu = Cpu::new();
        let mut bus = Bus::new(false);
        let err = image.apply(&mut cpu, &mut bus).unwrap_err();
        assert!(matches!(err, EmulatorError::CoreImageMalformed(_)));
        // Rejected before anything was written
        assert_eq!(bus.ext.instruction_field(), 0);
        assert_eq!(cpu.regs().pc(), 0);
    }

    #[test]
    fn bad_enable_state_leaves_the_machine_untouched() {
        let (cpu, bus) = sample_machine();
        let mut image = CoreImage::capture(&cpu, &bus, 0);
        image.intr.state = 7;

        let mut cpu2 = Cpu::new();
        let mut bus2 = Bus::new(true);
        let err = image.apply(&mut cpu2, &mut bus2).unwrap_err();
        assert!(matches!(err, EmulatorError::CoreImageMalformed(_)));
        assert_eq!(bus2.memory.read(0o200), 0);
        assert_eq!(cpu2.regs().ac(), 0);
    }
}
