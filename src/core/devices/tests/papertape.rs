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

//! PC8E mounting and contained I/O error behavior

use super::super::super::error::{DeviceError, EmulatorError};
use super::super::punch::{PUNCH_UNIT, READER_UNIT};
use super::super::*;
use super::fresh_state;
use std::io::Write;
use std::path::Path;

#[test]
fn test_reader_consumes_mounted_tape() {
    let mut tape = tempfile::NamedTempFile::new().unwrap();
    tape.write_all(&[0o101, 0o102]).unwrap();

    let mut pt = PaperTape::new();
    pt.mount(READER_UNIT, tape.path()).unwrap();

    let (mut regs, mut intr) = fresh_state();
    let mut ctx = IoContext {
        regs: &mut regs,
        intr: &mut intr,
    };

    // RFC fetches, RSF skips, RRB delivers
    pt.dispatch(0o6014, &mut ctx).unwrap();
    pt.dispatch(0o6011, &mut ctx).unwrap();
    pt.dispatch(0o6012, &mut ctx).unwrap();
    assert_eq!(regs.pc(), 1);
    assert_eq!(regs.ac(), 0o101);
    assert_eq!(intr.requests(), 0);

    // Combined RRB+RFC picks up the second frame
    regs.set_ac(0);
    let mut ctx = IoContext {
        regs: &mut regs,
        intr: &mut intr,
    };
    pt.dispatch(0o6014, &mut ctx).unwrap();
    pt.dispatch(0o6016, &mut ctx).unwrap();
    assert_eq!(regs.ac(), 0o102);
}

#[test]
fn test_unmounted_reader_stays_not_ready() {
    let mut pt = PaperTape::new();
    let (mut regs, mut intr) = fresh_state();
    let mut ctx = IoContext {
        regs: &mut regs,
        intr: &mut intr,
    };

    // RFC on an empty reader is contained: no error, no flag
    pt.dispatch(0o6014, &mut ctx).unwrap();
    pt.dispatch(0o6011, &mut ctx).unwrap();
    assert_eq!(regs.pc(), 0);
    assert_eq!(intr.requests(), 0);
}

#[test]
fn test_end_of_tape_stays_not_ready() {
    let tape = tempfile::NamedTempFile::new().unwrap();

    let mut pt = PaperTape::new();
    pt.mount(READER_UNIT, tape.path()).unwrap();

    let (mut regs, mut intr) = fresh_state();
    let mut ctx = IoContext {
        regs: &mut regs,
        intr: &mut intr,
    };
    pt.dispatch(0o6014, &mut ctx).unwrap();
    pt.dispatch(0o6011, &mut ctx).unwrap();
    assert_eq!(regs.pc(), 0);
}

#[test]
fn test_mount_missing_file_is_reported() {
    let mut pt = PaperTape::new();
    let err = pt
        .mount(READER_UNIT, Path::new("/no/such/tape.bin"))
        .unwrap_err();
    assert!(matches!(err, DeviceError::OpenFailed { .. }));
}

#[test]
fn test_mount_bad_unit() {
    let mut pt = PaperTape::new();
    let err = pt.mount(0o77, Path::new("tape.bin")).unwrap_err();
    assert!(matches!(err, DeviceError::WrongUnit { unit: 0o77, .. }));
}

#[test]
fn test_registry_mounts_punch_by_mnemonic() {
    // "ptr" and "ptp" are two units of one controller; the mount
    // path must reach the punch side through its own mnemonic
    let tape = tempfile::NamedTempFile::new().unwrap();

    let mut registry = DeviceRegistry::new();
    registry.register(Box::new(PaperTape::new())).unwrap();
    registry.mount_by_name("ptp", tape.path()).unwrap();

    let (mut regs, mut intr) = fresh_state();
    regs.set_ac(0o125);
    let mut ctx = IoContext {
        regs: &mut regs,
        intr: &mut intr,
    };
    registry.dispatch(PUNCH_UNIT, 0o6026, &mut ctx).unwrap(); // PLS
    registry.power_down();

    let punched = std::fs::read(tape.path()).unwrap();
    assert_eq!(punched, vec![0o125]);
}

#[test]
fn test_registry_rejects_unknown_mnemonic() {
    let mut registry = DeviceRegistry::new();
    registry.register(Box::new(PaperTape::new())).unwrap();
    let err = registry
        .mount_by_name("dectape", Path::new("tape.bin"))
        .unwrap_err();
    assert!(matches!(err, EmulatorError::UnknownDevice(_)));
}

#[test]
fn test_punch_appends_to_mounted_tape() {
    let tape = tempfile::NamedTempFile::new().unwrap();

    let mut pt = PaperTape::new();
    pt.mount(PUNCH_UNIT, tape.path()).unwrap();

    let (mut regs, mut intr) = fresh_state();
    regs.set_ac(0o252);
    let mut ctx = IoContext {
        regs: &mut regs,
        intr: &mut intr,
    };
    pt.dispatch(0o6026, &mut ctx).unwrap(); // PLS
    assert_eq!(ctx.intr.requests(), 1);
    pt.dispatch(0o6022, &mut ctx).unwrap(); // PCF
    pt.power_down();

    let punched = std::fs::read(tape.path()).unwrap();
    assert_eq!(punched, vec![0o252]);
}
