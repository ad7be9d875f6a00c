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

//! Core emulation components
//!
//! This module contains all hardware emulation components:
//! - CPU (KK8E processor)
//! - Core memory (one field, or eight with the KM8E)
//! - Memory extension and time-share control (KM8E)
//! - Interrupt controller
//! - Device registry and the standard peripherals
//! - Core image persistence
//! - System integration

pub mod bus;
pub mod console;
pub mod core_image;
pub mod cpu;
pub mod devices;
pub mod error;
pub mod interrupt;
pub mod memext;
pub mod memory;
pub mod registers;
pub mod system;

// Re-export commonly used types
pub use bus::Bus;
pub use console::{BufferConsole, Console};
pub use core_image::CoreImage;
pub use cpu::Cpu;
pub use devices::{Device, DeviceRegistry, IoContext};
pub use error::{DeviceError, EmulatorError, Result};
pub use interrupt::{EnableState, InterruptController};
pub use memext::MemoryExtension;
pub use memory::Memory;
pub use registers::RegisterFile;
pub use system::{MachineConfig, System};
