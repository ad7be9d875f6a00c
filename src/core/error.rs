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

/// Emulator error types
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator
///
/// Three families of failure with different policies:
///
/// - **Configuration errors** (duplicate unit, unknown mount target, bad
///   core image): fatal before emulation starts, non-fatal afterwards
///   (the affected unit stays idle).
/// - **Internal consistency errors** (IRQ counter underflow, dispatch to
///   an unregistered unit): always fatal. These indicate a bug in the
///   emulator's own request/withdraw discipline or decode stage, so the
///   run loop halts and dumps state instead of attempting recovery.
/// - **Device-level I/O errors**: contained within the device and
///   surfaced as warnings; see [`DeviceError`].
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("core image file not found: {0}")]
    CoreImageNotFound(String),

    #[error("core image version mismatch: got {got}, expected {expected}")]
    CoreImageVersion { expected: u32, got: u32 },

    #[error("core image is malformed: {0}")]
    CoreImageMalformed(String),

    #[error("core image holds {got} words but the machine has {expected}")]
    CoreImageSize { expected: usize, got: usize },

    #[error("device code {unit:02o} is already claimed by {label}")]
    DuplicateUnit { unit: u8, label: String },

    #[error("no device registered for unit {unit:02o}")]
    UnknownUnit { unit: u8 },

    #[error("no mountable device named {0:?}")]
    UnknownDevice(String),

    #[error("dispatch to unregistered unit {unit:02o} (decode fault)")]
    UnregisteredDispatch { unit: u8 },

    #[error("interrupt request counter underflow")]
    IrqUnderflow,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

/// Device-level error types
///
/// A device failure never crashes the machine: the registry reports the
/// error to the operator and the device keeps answering not-ready to
/// the CPU.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device {0} has no mountable media")]
    NotMountable(String),

    #[error("unit {unit:02o} of {label} is not mountable")]
    WrongUnit { label: String, unit: u8 },

    #[error("cannot open {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("backing file unreadable: {0}")]
    ReadFailed(String),
}
