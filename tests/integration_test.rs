// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! End-to-end scenarios, each a full program given as `(mnemonic, immediate)`
//! pairs run through a real [`Vm`], with output asserted against captured
//! stdout.

use njvm::bytecode::{encode, op};
use njvm::io::MockConsole;
use njvm::vm::Vm;

fn run(program: &[(u8, i32)], input: &[u8], stack_kb: u32, heap_kb: u32) -> String {
    let words: Vec<u32> = program.iter().map(|&(opcode, imm)| encode(opcode, imm)).collect();
    let mut vm = Vm::new(words, vec![], stack_kb, heap_kb, false, false, MockConsole::with_input(input)).unwrap();
    vm.run().unwrap();
    vm.into_console().output_str()
}

#[test]
fn scenario_1_arithmetic() {
    let out = run(
        &[(op::PUSHC, 2), (op::PUSHC, 3), (op::ADD, 0), (op::WRINT, 0), (op::HALT, 0)],
        b"",
        4,
        8192,
    );
    assert_eq!(out, "5");
}

#[test]
fn scenario_2_loop_with_frame_sums_one_to_ten() {
    let prog = vec![
        (op::ASF, 2),
        (op::PUSHC, 0),
        (op::POPL, 0), // acc = 0
        (op::PUSHC, 1),
        (op::POPL, 1), // i = 1
        // loop:
        (op::PUSHL, 1),
        (op::PUSHC, 10),
        (op::LE, 0),
        (op::BRF, 18), // if !(i <= 10) goto end
        (op::PUSHL, 0),
        (op::PUSHL, 1),
        (op::ADD, 0),
        (op::POPL, 0), // acc += i
        (op::PUSHL, 1),
        (op::PUSHC, 1),
        (op::ADD, 0),
        (op::POPL, 1), // i += 1
        (op::JMP, 5),
        // end:
        (op::PUSHL, 0),
        (op::WRINT, 0),
        (op::RSF, 0),
        (op::HALT, 0),
    ];
    let out = run(&prog, b"", 4, 8192);
    assert_eq!(out, "55");
}

#[test]
fn scenario_3_heap_object() {
    let out = run(
        &[
            (op::NEW, 2),
            (op::DUP, 0),
            (op::PUSHC, 7),
            (op::PUTF, 0),
            (op::GETF, 0),
            (op::WRINT, 0),
            (op::HALT, 0),
        ],
        b"",
        4,
        8192,
    );
    assert_eq!(out, "7");
}

#[test]
fn new_object_members_start_nil_not_a_bogus_offset_zero_reference() {
    let out = run(
        &[
            (op::NEW, 1),
            (op::GETF, 0),
            (op::PUSHN, 0),
            (op::REFEQ, 0),
            (op::WRINT, 0),
            (op::HALT, 0),
        ],
        b"",
        4,
        8192,
    );
    assert_eq!(out, "1");
}

#[test]
fn unwritten_member_survives_a_collection_as_nil() {
    let mut prog = vec![
        (op::NEW, 2),
        (op::DUP, 0),
        (op::PUSHC, 7),
        (op::PUTF, 0),
        (op::POPR, 0), // ret = the object; member 1 left nil
    ];
    for _ in 0..100 {
        prog.push((op::NEW, 1));
        prog.push((op::DROP, 1));
    }
    prog.push((op::PUSHR, 0));
    prog.push((op::GETF, 1));
    prog.push((op::PUSHN, 0));
    prog.push((op::REFEQ, 0));
    prog.push((op::WRINT, 0));
    prog.push((op::HALT, 0));
    let out = run(&prog, b"", 4, 1);
    assert_eq!(out, "1");
}

#[test]
fn scenario_4_gc_under_pressure_keeps_the_last_survivor_reachable() {
    // A 1 KiB heap can't hold all 200 one-member objects at once, forcing
    // several collections; only the last object stays reachable (via ret).
    let mut prog = vec![(op::PUSHN, 0), (op::POPR, 0)];
    for _ in 0..200 {
        prog.push((op::NEW, 1));
        prog.push((op::DUP, 0));
        prog.push((op::PUSHC, i32::from(b'Z')));
        prog.push((op::PUTF, 0));
        prog.push((op::POPR, 0));
    }
    prog.push((op::PUSHR, 0));
    prog.push((op::GETF, 0));
    prog.push((op::WRCHR, 0));
    prog.push((op::HALT, 0));
    let out = run(&prog, b"", 4, 1);
    assert_eq!(out, "Z");
}

#[test]
fn scenario_5_bigint_overflow_computes_two_to_the_hundred() {
    let prog = vec![
        (op::ASF, 2),
        (op::PUSHC, 1),
        (op::POPL, 0), // value = 1
        (op::PUSHC, 0),
        (op::POPL, 1), // counter = 0
        // loop:
        (op::PUSHL, 1),
        (op::PUSHC, 100),
        (op::LT, 0),
        (op::BRF, 18),
        (op::PUSHL, 0),
        (op::PUSHC, 2),
        (op::MUL, 0),
        (op::POPL, 0), // value *= 2
        (op::PUSHL, 1),
        (op::PUSHC, 1),
        (op::ADD, 0),
        (op::POPL, 1), // counter += 1
        (op::JMP, 5),
        // end:
        (op::PUSHL, 0),
        (op::WRINT, 0),
        (op::RSF, 0),
        (op::HALT, 0),
    ];
    let out = run(&prog, b"", 4, 8192);
    assert_eq!(out, "1267650600228229401496703205376");
}

#[test]
fn scenario_6_static_data_survives_gc() {
    // Stash a 3-member array in static_data[0], then allocate and discard
    // enough garbage to overflow a 1 KiB heap's half and force a collection,
    // before reading the array back through static data.
    let mut prog = vec![(op::NEW, 3), (op::POPG, 0)];
    for _ in 0..100 {
        prog.push((op::NEW, 1));
        prog.push((op::DROP, 1));
    }
    prog.push((op::PUSHG, 0));
    prog.push((op::GETSZ, 0));
    prog.push((op::WRINT, 0));
    prog.push((op::HALT, 0));
    let words: Vec<u32> = prog.iter().map(|&(opcode, imm)| encode(opcode, imm)).collect();
    let mut vm = Vm::new(words, vec![None], 4, 1, false, false, MockConsole::default()).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.into_console().output_str(), "3");
}

#[test]
fn pushc_then_wrint_round_trips_every_24_bit_boundary_value() {
    for k in [0, 1, -1, (1 << 23) - 1, -(1 << 23)] {
        let out = run(&[(op::PUSHC, k), (op::WRINT, 0), (op::HALT, 0)], b"", 4, 8192);
        assert_eq!(out, k.to_string());
    }
}
