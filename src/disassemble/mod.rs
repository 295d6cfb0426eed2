// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Renders a program's instruction words as readable mnemonics, for the
//! `--list` CLI flag.

#[cfg(test)]
mod mod_test;

use std::fmt::Write as _;

use crate::bytecode::{decode_immediate, decode_opcode, info_for_opcode};
use crate::error::VmError;

/// Disassemble every instruction in `program` into one line per
/// instruction: `<index>: <mnemonic>` or `<index>: <mnemonic> <immediate>`
/// for opcodes that carry an operand.
///
/// # Errors
/// Returns [`VmError::UnknownOpcode`] if any instruction word decodes to
/// an opcode with no entry in the instruction table.
pub fn disassemble(program: &[u32]) -> Result<String, VmError> {
    let mut out = String::new();
    for (index, &word) in program.iter().enumerate() {
        let opcode = decode_opcode(word);
        let info = info_for_opcode(opcode)?;
        if info.requires_operand {
            let immediate = decode_immediate(word);
            writeln!(out, "{index}: {} {immediate}", info.name).expect("writing to a String never fails");
        } else {
            writeln!(out, "{index}: {}", info.name).expect("writing to a String never fails");
        }
    }
    Ok(out)
}
