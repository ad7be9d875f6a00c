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

//! Test fixtures for common test scenarios

use pdp8e::core::console::BufferConsole;
use pdp8e::core::devices::teletype::Teletype;
use pdp8e::core::system::{MachineConfig, System};

/// Create a full machine with the KM8E installed
#[allow(dead_code)]
pub fn create_test_system() -> System {
    System::new(MachineConfig::default())
}

/// Create a minimal 4K machine without the memory extension
#[allow(dead_code)]
pub fn create_basic_system() -> System {
    System::new(MachineConfig {
        extended_memory: false,
    })
}

/// Create a machine with the console teletype wired to a buffer
#[allow(dead_code)]
pub fn create_console_system() -> (System, BufferConsole) {
    let console = BufferConsole::new();
    let mut system = System::new(MachineConfig::default());
    system
        .install_device(Box::new(Teletype::new(Box::new(console.clone()))))
        .expect("teletype units are free on a fresh machine");
    (system, console)
}

/// Load a program into core at the specified extended address
#[allow(dead_code)]
pub fn load_program(system: &mut System, origin: usize, program: &[u16]) {
    for (i, &word) in program.iter().enumerate() {
        system.deposit(origin + i, word);
    }
}
