// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

use super::disassemble;
use crate::bytecode::{encode, op};

#[test]
fn prints_one_line_per_instruction_with_operands_where_required() {
    let program = vec![encode(op::PUSHC, 42), encode(op::ADD, 0), encode(op::HALT, 0)];
    let out = disassemble(&program).unwrap();
    assert_eq!(out, "0: pushc 42\n1: add\n2: halt\n");
}

#[test]
fn prints_negative_immediates_with_a_sign() {
    let program = vec![encode(op::BRF, -5)];
    let out = disassemble(&program).unwrap();
    assert_eq!(out, "0: brf -5\n");
}

#[test]
fn unknown_opcode_is_rejected() {
    let err = disassemble(&[encode(255, 0)]).unwrap_err();
    assert!(matches!(err, crate::error::VmError::UnknownOpcode(255)));
}

#[test]
fn empty_program_disassembles_to_an_empty_string() {
    assert_eq!(disassemble(&[]).unwrap(), "");
}
