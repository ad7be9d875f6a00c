// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

use super::*;
use crate::core::console::BufferConsole;
use crate::core::devices::teletype::Teletype;


/// A machine with the console teletype installed, sharing its buffers
fn console_machine() -> (System, BufferConsole) {
    let console = BufferConsole::new();
    let mut system = System::new(MachineConfig::default());
    system
        .install_device(Box::new(Teletype::new(Box::new(console.clone()))))
        .unwrap();
    (system, console)
}
