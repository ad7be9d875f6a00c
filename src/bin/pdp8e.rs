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

//! Headless PDP-8/E emulator
//!
//! Runs a machine from a core image with the console teletype wired to
//! stdin/stdout and the paper tape units mountable from the command
//! line.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use clap::Parser;
use log::{error, info, warn};

use pdp8e::core::console::Console;
use pdp8e::core::core_image::CoreImage;
use pdp8e::core::devices::punch::PaperTape;
use pdp8e::core::devices::teletype::Teletype;
use pdp8e::core::error::Result;
use pdp8e::core::system::{MachineConfig, System};

/// Console wired to the process's own stdin and stdout
///
/// A reader thread blocks on stdin and forwards bytes over a channel
/// so the emulation loop can poll without blocking.
struct StdioConsole {
    input: Receiver<u8>,
}

impl StdioConsole {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut byte = [0u8; 1];
            let mut stdin = io::stdin();
            while stdin.read_exact(&mut byte).is_ok() {
                if tx.send(byte[0]).is_err() {
                    break;
                }
            }
        });
        Self { input: rx }
    }
}

impl Console for StdioConsole {
    fn poll_char(&mut self) -> Option<u8> {
        match self.input.try_recv() {
            Ok(ch) => Some(ch),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn put_char(&mut self, ch: u8) {
        let mut stdout = io::stdout();
        let _ = stdout.write_all(&[ch]);
        let _ = stdout.flush();
    }
}

fn parse_octal(s: &str) -> std::result::Result<u16, String> {
    u16::from_str_radix(s, 8).map_err(|e| format!("not an octal value: {}", e))
}

/// DEC PDP-8/E emulator
#[derive(Parser)]
#[command(name = "pdp8e")]
#[command(about = "PDP-8/E minicomputer emulator", long_about = None)]
struct Args {
    /// Core image to restore before starting
    core_image: Option<PathBuf>,

    /// Save a core image here when the machine halts
    #[arg(short = 's', long)]
    save: Option<PathBuf>,

    /// Attach a file to a device, e.g. --mount ptr=paper.tape
    #[arg(short = 'm', long = "mount", value_name = "DEV=FILE")]
    mounts: Vec<String>,

    /// Starting address (octal)
    #[arg(long, value_parser = parse_octal, default_value = "200")]
    start: u16,

    /// Console switch register (octal)
    #[arg(long, value_parser = parse_octal, default_value = "0")]
    switches: u16,

    /// Number of instructions to execute
    #[arg(short = 'n', long, default_value = "100000")]
    instructions: u64,

    /// Run without the KM8E (4K of core, no memory extension IOTs)
    #[arg(long)]
    no_extended_memory: bool,
}

fn main() -> Result<()> {
    // Initialize logger with default level INFO
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("pdp8e v{}", env!("CARGO_PKG_VERSION"));
    info!("PDP-8/E minicomputer emulator");

    // Parse command line arguments
    let args = Args::parse();

    let mut system = System::new(MachineConfig {
        extended_memory: !args.no_extended_memory,
    });

    // Standard peripherals: console teletype and paper tape
    system.install_device(Box::new(Teletype::new(Box::new(StdioConsole::new()))))?;
    system.install_device(Box::new(PaperTape::new()))?;

    for spec in &args.mounts {
        let (name, path) = spec.split_once('=').ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("bad mount spec '{}', expected DEV=FILE", spec),
            )
        })?;
        info!("Mounting {} on {}", path, name);
        system.mount_by_name(name, path.as_ref())?;
    }

    if let Some(path) = &args.core_image {
        info!("Restoring core image from: {}", path.display());
        let image = CoreImage::load_from_file(path)?;
        if image.extended_memory() == args.no_extended_memory {
            warn!("core image memory configuration differs from the command line");
        }
        system.restore_image(&image)?;
        info!("Image taken at {}", image.saved_at());
    } else {
        system.set_pc(args.start);
    }

    system.set_switches(args.switches);
    system.power_up()?;

    // Run for the requested number of instructions, or until HLT
    let total = args.instructions;
    let log_interval = (total / 10).max(1); // Log ~10 times during execution
    let mut executed: u64 = 0;

    while executed < total && !system.halted() {
        let chunk = log_interval.min(total - executed);
        match system.run(chunk) {
            Ok(n) => executed += n,
            Err(e) => {
                error!("Machine fault after {} instructions: {}", executed, e);
                system.power_down();
                return Err(e);
            }
        }
        if !system.halted() && executed < total {
            info!(
                "Progress: {}/{} instructions | PC: {:04o} | AC: {:04o}",
                executed,
                total,
                system.pc(),
                system.ac()
            );
        }
    }

    if system.halted() {
        info!("Machine halted at PC={:04o}", system.pc());
    } else {
        info!("Instruction budget exhausted");
    }
    info!("Total instructions: {}", system.instructions());

    if let Some(path) = &args.save {
        info!("Saving core image to: {}", path.display());
        system.capture_image().save_to_file(path)?;
    }

    system.power_down();
    Ok(())
}
