// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

use super::super::*;
use super::{load, machine};

fn run_one(word: u16) -> (Cpu, crate::core::bus::Bus) {
    let (cpu, mut bus) = machine();
    load(&mut bus, 0o200, &[word]);
    (cpu, bus)
}

fn step_with(word: u16, setup: impl FnOnce(&mut Cpu)) -> Cpu {
    let (mut cpu, mut bus) = run_one(word);
    setup(&mut cpu);
    cpu.step(&mut bus).unwrap();
    cpu
}

#[test]
fn group1_cla_cll_cma_cml() {
    let cpu = step_with(0o7340, |c| {
        // CLA CLL CMA: AC ends complement of zero
        c.regs_mut().set_ac(0o1234);
        c.regs_mut().set_link(true);
    });
    assert_eq!(cpu.regs().ac(), 0o7777);
    assert!(!cpu.regs().link());

    let cpu = step_with(0o7020, |c| c.regs_mut().set_link(false)); // CML
    assert!(cpu.regs().link());
}

#[test]
fn group1_iac_carries_into_link() {
    let cpu = step_with(0o7001, |c| {
        c.regs_mut().set_ac(0o7777);
        c.regs_mut().set_link(false);
    });
    assert_eq!(cpu.regs().ac(), 0);
    assert!(cpu.regs().link());
}

#[test]
fn group1_cll_iac_sequence() {
    // CLL IAC in one word: clear happens before the increment
    let cpu = step_with(0o7101, |c| {
        c.regs_mut().set_ac(0o7777);
        c.regs_mut().set_link(true);
    });
    assert_eq!(cpu.regs().ac(), 0);
    assert!(cpu.regs().link());
}

#[test]
fn group1_rotates_include_link() {
    // RAL: link becomes old AC bit 0, AC bit 11 becomes old link
    let cpu = step_with(0o7004, |c| {
        c.regs_mut().set_ac(0o4000);
        c.regs_mut().set_link(false);
    });
    assert_eq!(cpu.regs().ac(), 0);
    assert!(cpu.regs().link());

    // RAR: AC bit 0 falls into link
    let cpu = step_with(0o7010, |c| {
        c.regs_mut().set_ac(0o0001);
        c.regs_mut().set_link(false);
    });
    assert_eq!(cpu.regs().ac(), 0);
    assert!(cpu.regs().link());

    // RTL rotates twice
    let cpu = step_with(0o7006, |c| {
        c.regs_mut().set_ac(0o0001);
        c.regs_mut().set_link(false);
    });
    assert_eq!(cpu.regs().ac(), 0o0004);
}

#[test]
fn group1_bsw_swaps_halves() {
    let cpu = step_with(0o7002, |c| {
        c.regs_mut().set_ac(0o1207);
        c.regs_mut().set_link(true);
    });
    assert_eq!(cpu.regs().ac(), 0o0712);
    assert!(cpu.regs().link());
}

#[test]
fn group2_skip_conditions_or_together() {
    // SMA on negative AC
    let cpu = step_with(0o7500, |c| c.regs_mut().set_ac(0o4000));
    assert_eq!(cpu.regs().pc(), 0o202);

    // SZA on nonzero AC does not skip
    let cpu = step_with(0o7440, |c| c.regs_mut().set_ac(1));
    assert_eq!(cpu.regs().pc(), 0o201);

    // SNL
    let cpu = step_with(0o7420, |c| c.regs_mut().set_link(true));
    assert_eq!(cpu.regs().pc(), 0o202);

    // SMA SZA: either condition skips
    let cpu = step_with(0o7540, |c| c.regs_mut().set_ac(0));
    assert_eq!(cpu.regs().pc(), 0o202);
}

#[test]
fn group2_reverse_sense() {
    // SPA on a positive AC
    let cpu = step_with(0o7510, |c| c.regs_mut().set_ac(0o0001));
    assert_eq!(cpu.regs().pc(), 0o202);

    // SKP alone is unconditional
    let cpu = step_with(0o7410, |_| {});
    assert_eq!(cpu.regs().pc(), 0o202);
}

#[test]
fn group2_skip_senses_before_cla() {
    // SZA CLA with nonzero AC: no skip, but AC still cleared
    let cpu = step_with(0o7640, |c| c.regs_mut().set_ac(0o0042));
    assert_eq!(cpu.regs().pc(), 0o201);
    assert_eq!(cpu.regs().ac(), 0);
}

#[test]
fn group2_osr_ors_switch_register() {
    let cpu = step_with(0o7404, |c| {
        c.regs_mut().set_ac(0o0070);
        c.regs_mut().set_sr(0o7000);
    });
    assert_eq!(cpu.regs().ac(), 0o7070);
}

#[test]
fn group3_mq_transfers() {
    // MQL: AC to MQ, AC cleared
    let cpu = step_with(0o7421, |c| c.regs_mut().set_ac(0o0123));
    assert_eq!(cpu.regs().mq(), 0o0123);
    assert_eq!(cpu.regs().ac(), 0);

    // MQA ors MQ into AC
    let cpu = step_with(0o7501, |c| {
        c.regs_mut().set_ac(0o0700);
        c.regs_mut().set_mq(0o0007);
    });
    assert_eq!(cpu.regs().ac(), 0o0707);

    // MQA MQL together swap
    let (mut cpu, mut bus) = run_one(0o7521);
    cpu.regs_mut().set_ac(0o1111);
    cpu.regs_mut().set_mq(0o2222);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.regs().ac(), 0o2222);
    assert_eq!(cpu.regs().mq(), 0o1111);
}
