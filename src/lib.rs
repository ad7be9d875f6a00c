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

//! PDP-8/E emulator core library
//!
//! This library provides the core emulation components for a DEC
//! PDP-8/E minicomputer, including the KK8E processor, up to 32K words
//! of core memory with the KM8E extension, the interrupt system and
//! the standard peripherals.
//!
//! # Example
//!
//! ```
//! use pdp8e::core::system::{MachineConfig, System};
//!
//! let mut system = System::new(MachineConfig::default());
//! system.deposit(0o200, 0o7402); // HLT
//! system.set_pc(0o200);
//! system.power_up().unwrap();
//! system.run(1).unwrap();
//! assert!(system.halted());
//! ```

pub mod core;
