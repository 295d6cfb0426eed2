// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! The fetch-decode-execute loop and opcode semantics.
//!
//! [`Vm`] owns every piece of process-wide state the reference
//! implementation keeps as globals: the program, static data, operand
//! stack, heap, and the handful of machine registers (`pc`, `fp`, the
//! bigint scratch registers, and `ret`). Bundling them into one value
//! makes the machine re-entrant and lets tests build a fresh `Vm` per
//! case instead of relying on process-wide state.


use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;

use crate::bigint;
use crate::bytecode::{decode_immediate, decode_opcode, op};
use crate::error::VmError;
use crate::heap::Heap;
use crate::io::Console;
use crate::stack::{Slot, Stack};
use crate::types::{HeapAddr, ObjRef};

/// Bytes a single stack slot is billed as when translating `--stack KiB`
/// into a slot count. The reference machine sizes its stack the same way,
/// in units of its native `stack_slot` layout; ours is a tagged enum
/// rather than a C union, so this is a documented stand-in rather than a
/// `sizeof`.
const SLOT_BYTES: usize = 8;

/// The Ninja virtual machine.
pub struct Vm<C: Console> {
    pub(crate) program: Vec<u32>,
    pub(crate) static_data: Vec<ObjRef>,
    pub(crate) stack: Stack,
    pub(crate) heap: Heap,
    console: C,
    pending_byte: Option<u8>,
    pc: i32,
    fp: i32,
    op1: ObjRef,
    op2: ObjRef,
    res: ObjRef,
    rem: ObjRef,
    ret: ObjRef,
    gcpurge: bool,
    gcstats: bool,
}

impl<C: Console> Vm<C> {
    /// Build a VM ready to execute `program` against the given
    /// configuration. `static_data` starts out fully nil-initialized per
    /// the loader contract and is copied in verbatim.
    ///
    /// # Errors
    /// Propagates [`VmError::InvalidArgument`] if `heap_kb` can't be split
    /// into two equal halves.
    pub fn new(
        program: Vec<u32>,
        static_data: Vec<ObjRef>,
        stack_kb: u32,
        heap_kb: u32,
        gcpurge: bool,
        gcstats: bool,
        console: C,
    ) -> Result<Self, VmError> {
        let capacity = (stack_kb as usize * 1024) / SLOT_BYTES;
        Ok(Self {
            program,
            static_data,
            stack: Stack::new(capacity),
            heap: Heap::new(heap_kb)?,
            console,
            pending_byte: None,
            pc: 0,
            fp: 0,
            op1: None,
            op2: None,
            res: None,
            rem: None,
            ret: None,
            gcpurge,
            gcstats,
        })
    }

    /// Consume the VM and return its console, e.g. to read back everything
    /// a [`crate::io::MockConsole`] captured during a run.
    #[must_use]
    pub fn into_console(self) -> C {
        self.console
    }

    /// Run until `halt`.
    ///
    /// # Errors
    /// Returns the first [`VmError`] raised by fetch, decode, or any
    /// opcode handler. Every error is fatal to the run.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<(), VmError> {
        loop {
            let idx = usize::try_from(self.pc).map_err(|_| VmError::ProgramCounterOutOfBounds)?;
            let word = *self.program.get(idx).ok_or(VmError::ProgramCounterOutOfBounds)?;
            self.pc += 1;
            tracing::trace!(pc = idx, opcode = decode_opcode(word), "fetch");
            if !self.exec(word)? {
                return Ok(());
            }
        }
    }

    /// Decode and run a single instruction. Returns `false` only for
    /// `halt`.
    fn exec(&mut self, word: u32) -> Result<bool, VmError> {
        let opcode = decode_opcode(word);
        let imm = decode_immediate(word);
        match opcode {
            op::HALT => return Ok(false),
            op::PUSHC => {
                let v = self.new_integer(imm)?;
                self.stack.push_ref(v)?;
            }
            op::PUSHN => self.stack.push_ref(None)?,
            op::DUP => self.dup()?,
            op::DROP => self.stack.drop_n(imm)?,
            op::PUSHR => {
                self.stack.push_ref(self.ret)?;
                self.ret = None;
            }
            op::POPR => self.ret = self.stack.pop_ref()?,
            op::JMP => self.pc = imm,
            op::BRF => {
                self.pop_into_op1()?;
                if bigint::read(self, self.op1)?.is_zero() {
                    self.pc = imm;
                }
            }
            op::BRT => {
                self.pop_into_op1()?;
                if !bigint::read(self, self.op1)?.is_zero() {
                    self.pc = imm;
                }
            }
            op::CALL => {
                self.stack.push_prim(self.pc)?;
                self.pc = imm;
            }
            op::RET => self.pc = self.stack.pop_prim()?,
            op::ASF => self.asf(imm)?,
            op::RSF => self.rsf()?,
            op::PUSHL => self.pushl(imm)?,
            op::POPL => self.popl(imm)?,
            op::PUSHG => self.pushg(imm)?,
            op::POPG => self.popg(imm)?,
            op::RDINT => self.rdint()?,
            op::WRINT => self.wrint()?,
            op::RDCHR => self.rdchr()?,
            op::WRCHR => self.wrchr()?,
            op::ADD | op::SUB | op::MUL | op::DIV | op::MOD => self.arithmetic(opcode)?,
            op::EQ | op::NE | op::LT | op::LE | op::GT | op::GE => self.relational(opcode)?,
            op::NEW => self.new_compound(imm)?,
            op::GETF => self.getf(imm)?,
            op::PUTF => self.putf(imm)?,
            op::NEWA => self.newa()?,
            op::GETFA => self.getfa()?,
            op::PUTFA => self.putfa()?,
            op::GETSZ => self.getsz()?,
            op::REFEQ => self.refcmp(true)?,
            op::REFNE => self.refcmp(false)?,
            other => return Err(VmError::UnknownOpcode(other)),
        }
        Ok(true)
    }

    fn new_integer(&mut self, value: i32) -> Result<ObjRef, VmError> {
        bigint::write(self, &BigInt::from(value))
    }

    fn pop_into_op1(&mut self) -> Result<(), VmError> {
        self.op1 = self.stack.pop_ref()?;
        Ok(())
    }

    fn dup(&mut self) -> Result<(), VmError> {
        if self.stack.is_empty() {
            return Err(VmError::StackUnderflow);
        }
        let top = i32::try_from(self.stack.len() - 1).map_err(|_| VmError::StackOverflow)?;
        let value = self.stack.get(top)?.as_reference()?;
        self.stack.push_ref(value)
    }

    fn asf(&mut self, n: i32) -> Result<(), VmError> {
        if n < 0 {
            return Err(VmError::InvalidArgument("frame size can't be negative".to_owned()));
        }
        if !self.stack.has_room_for(1 + n as usize) {
            return Err(VmError::StackOverflow);
        }
        self.stack.push_prim(self.fp)?;
        self.fp = i32::try_from(self.stack.len()).map_err(|_| VmError::StackOverflow)?;
        for _ in 0..n {
            self.stack.push_ref(None)?;
        }
        Ok(())
    }

    fn rsf(&mut self) -> Result<(), VmError> {
        self.stack.truncate(self.fp)?;
        self.fp = self.stack.pop_prim()?;
        Ok(())
    }

    fn pushl(&mut self, k: i32) -> Result<(), VmError> {
        let idx = self.fp.checked_add(k).ok_or(VmError::StackIndexOutOfRange(k))?;
        let value = self.stack.get(idx)?.as_reference()?;
        self.stack.push_ref(value)
    }

    fn popl(&mut self, k: i32) -> Result<(), VmError> {
        let idx = self.fp.checked_add(k).ok_or(VmError::StackIndexOutOfRange(k))?;
        let value = self.stack.pop_ref()?;
        self.stack.set(idx, Slot::reference(value))
    }

    fn global_index(&self, k: i32) -> Result<usize, VmError> {
        usize::try_from(k)
            .ok()
            .filter(|&i| i < self.static_data.len())
            .ok_or(VmError::GlobalIndexOutOfRange(k))
    }

    fn pushg(&mut self, k: i32) -> Result<(), VmError> {
        let idx = self.global_index(k)?;
        self.stack.push_ref(self.static_data[idx])
    }

    fn popg(&mut self, k: i32) -> Result<(), VmError> {
        let idx = self.global_index(k)?;
        let value = self.stack.pop_ref()?;
        self.static_data[idx] = value;
        Ok(())
    }

    fn rdint(&mut self) -> Result<(), VmError> {
        let value = self.read_decimal()?;
        self.res = bigint::write(self, &value)?;
        self.stack.push_ref(self.res)
    }

    fn wrint(&mut self) -> Result<(), VmError> {
        self.pop_into_op1()?;
        let value = bigint::read(self, self.op1)?;
        self.console.write_str(&value.to_str_radix(10));
        Ok(())
    }

    fn rdchr(&mut self) -> Result<(), VmError> {
        // Open question in the reference design: what `rdchr` does at EOF.
        // We push -1 as an explicit sentinel rather than inherit undefined
        // behavior from an unchecked read.
        let value = self.next_byte().map_or(-1, i32::from);
        let r = self.new_integer(value)?;
        self.stack.push_ref(r)
    }

    fn wrchr(&mut self) -> Result<(), VmError> {
        self.pop_into_op1()?;
        let value = bigint::read(self, self.op1)?;
        let code = bigint::to_i32(&value)?;
        self.console.write_byte(code as u8);
        Ok(())
    }

    fn next_byte(&mut self) -> Option<u8> {
        self.pending_byte.take().or_else(|| self.console.read_byte())
    }

    fn unread_byte(&mut self, byte: u8) {
        self.pending_byte = Some(byte);
    }

    /// Scan a (possibly signed) decimal literal off the console, matching
    /// the whitespace-skipping, first-non-digit-stops semantics of a
    /// formatted stream read.
    fn read_decimal(&mut self) -> Result<BigInt, VmError> {
        let mut byte = loop {
            match self.next_byte() {
                Some(b) if b.is_ascii_whitespace() => continue,
                Some(b) => break b,
                None => return Err(VmError::MalformedInteger("unexpected end of input".to_owned())),
            }
        };

        let mut text = String::new();
        if byte == b'-' || byte == b'+' {
            text.push(byte as char);
            byte = self.next_byte().ok_or_else(|| VmError::MalformedInteger(text.clone()))?;
        }

        let mut saw_digit = false;
        loop {
            if byte.is_ascii_digit() {
                text.push(byte as char);
                saw_digit = true;
                match self.next_byte() {
                    Some(b) => byte = b,
                    None => break,
                }
            } else {
                self.unread_byte(byte);
                break;
            }
        }

        if !saw_digit {
            return Err(VmError::MalformedInteger(text));
        }
        text.parse::<BigInt>().map_err(|_| VmError::MalformedInteger(text))
    }

    fn arithmetic(&mut self, opcode: u8) -> Result<(), VmError> {
        let op2 = self.stack.pop_ref()?;
        let op1 = self.stack.pop_ref()?;
        self.op1 = op1;
        self.op2 = op2;
        let a = bigint::read(self, self.op1)?;
        let b = bigint::read(self, self.op2)?;

        if opcode == op::DIV || opcode == op::MOD {
            if b.is_zero() {
                return Err(VmError::DivisionByZero);
            }
            let (quotient, remainder) = a.div_rem(&b);
            self.res = bigint::write(self, &quotient)?;
            self.rem = bigint::write(self, &remainder)?;
            let pushed = if opcode == op::DIV { self.res } else { self.rem };
            return self.stack.push_ref(pushed);
        }

        let result = match opcode {
            op::ADD => a + b,
            op::SUB => a - b,
            op::MUL => a * b,
            _ => unreachable!("arithmetic dispatch covers only add/sub/mul/div/mod"),
        };
        self.res = bigint::write(self, &result)?;
        self.stack.push_ref(self.res)
    }

    fn relational(&mut self, opcode: u8) -> Result<(), VmError> {
        let op2 = self.stack.pop_ref()?;
        let op1 = self.stack.pop_ref()?;
        self.op1 = op1;
        self.op2 = op2;
        let a = bigint::read(self, self.op1)?;
        let b = bigint::read(self, self.op2)?;
        let cmp = a.cmp(&b);
        let truth = match opcode {
            op::EQ => cmp == Ordering::Equal,
            op::NE => cmp != Ordering::Equal,
            op::LT => cmp == Ordering::Less,
            op::LE => cmp != Ordering::Greater,
            op::GT => cmp == Ordering::Greater,
            op::GE => cmp != Ordering::Less,
            _ => unreachable!("relational dispatch covers only eq/ne/lt/le/gt/ge"),
        };
        let result = self.new_integer(i32::from(truth))?;
        self.stack.push_ref(result)
    }

    fn new_compound(&mut self, k: i32) -> Result<(), VmError> {
        let size = u32::try_from(k).map_err(|_| VmError::InvalidArgument("object size can't be negative".to_owned()))?;
        let addr = self.halloc(true, size)?;
        self.stack.push_ref(Some(addr))
    }

    fn read_member(&self, obj: ObjRef, index: i32) -> Result<ObjRef, VmError> {
        let addr = obj.ok_or(VmError::NilDereference)?;
        let header = self.heap.header_of(addr);
        if !header.is_compound() {
            return Err(VmError::NotCompound);
        }
        let idx = u32::try_from(index).ok().filter(|&i| i < header.size()).ok_or(VmError::IndexOutOfRange(index))?;
        Ok(self.heap.member(addr, idx))
    }

    fn write_member(&mut self, obj: ObjRef, index: i32, value: ObjRef) -> Result<(), VmError> {
        let addr = obj.ok_or(VmError::NilDereference)?;
        let header = self.heap.header_of(addr);
        if !header.is_compound() {
            return Err(VmError::NotCompound);
        }
        let idx = u32::try_from(index).ok().filter(|&i| i < header.size()).ok_or(VmError::IndexOutOfRange(index))?;
        self.heap.set_member(addr, idx, value);
        Ok(())
    }

    fn getf(&mut self, k: i32) -> Result<(), VmError> {
        let obj = self.stack.pop_ref()?;
        let value = self.read_member(obj, k)?;
        self.stack.push_ref(value)
    }

    fn putf(&mut self, k: i32) -> Result<(), VmError> {
        let value = self.stack.pop_ref()?;
        let obj = self.stack.pop_ref()?;
        self.write_member(obj, k, value)
    }

    fn newa(&mut self) -> Result<(), VmError> {
        self.pop_into_op1()?;
        let index = bigint::read(self, self.op1)?;
        let n = bigint::to_i32(&index)?;
        self.new_compound(n)
    }

    fn getfa(&mut self) -> Result<(), VmError> {
        self.pop_into_op1()?;
        let index = bigint::read(self, self.op1)?;
        let idx = bigint::to_i32(&index)?;
        let array = self.stack.pop_ref()?;
        let value = self.read_member(array, idx)?;
        self.stack.push_ref(value)
    }

    fn putfa(&mut self) -> Result<(), VmError> {
        let value = self.stack.pop_ref()?;
        self.pop_into_op1()?;
        let index = bigint::read(self, self.op1)?;
        let idx = bigint::to_i32(&index)?;
        let array = self.stack.pop_ref()?;
        self.write_member(array, idx, value)
    }

    fn getsz(&mut self) -> Result<(), VmError> {
        let obj = self.stack.pop_ref()?;
        let size = match obj {
            Some(addr) if self.heap.header_of(addr).is_compound() => {
                // Bounded by MAX_OBJECT_SIZE (2^30 - 1), always fits an i32.
                self.heap.header_of(addr).size() as i32
            }
            _ => -1,
        };
        let result = self.new_integer(size)?;
        self.stack.push_ref(result)
    }

    fn refcmp(&mut self, want_equal: bool) -> Result<(), VmError> {
        let b = self.stack.pop_ref()?;
        let a = self.stack.pop_ref()?;
        let equal = a == b;
        let result = self.new_integer(i32::from(equal == want_equal))?;
        self.stack.push_ref(result)
    }

    /// Bump-allocate an object, running the collector once if the first
    /// attempt doesn't fit.
    ///
    /// # Errors
    /// Returns [`VmError::OutOfMemory`] if the object still doesn't fit
    /// after a collection.
    pub(crate) fn halloc(&mut self, compound: bool, size: u32) -> Result<HeapAddr, VmError> {
        if let Some(addr) = self.heap.try_alloc(compound, size)? {
            return Ok(addr);
        }
        self.collect_garbage()?;
        self.heap.try_alloc(compound, size)?.ok_or(VmError::OutOfMemory)
    }

    /// Run a full collection. The root set is exactly the bigint scratch
    /// registers, `ret`, every static data slot, and every reference-typed
    /// stack slot below `sp` — see [`Heap::collect`].
    #[tracing::instrument(skip(self))]
    fn collect_garbage(&mut self) -> Result<(), VmError> {
        let gcpurge = self.gcpurge;
        let gcstats = self.gcstats;
        let Self { op1, op2, res, rem, ret, static_data, stack, heap, console, .. } = self;
        let roots = [op1, op2, res, rem, ret]
            .into_iter()
            .chain(static_data.iter_mut())
            .chain(stack.roots_mut());
        let stats = heap.collect(roots, gcpurge)?;
        tracing::debug!(
            allocations_before = stats.allocations_before,
            bytes_before = stats.bytes_before,
            allocations_after = stats.allocations_after,
            bytes_after = stats.bytes_after,
            "garbage collected"
        );
        if gcstats {
            console.write_str(&format!(
                "Allocated since last gc: {} objects ({} bytes).\n",
                stats.allocations_before, stats.bytes_before
            ));
            console.write_str(&format!(
                "Live objects: {} ({} bytes).\n",
                stats.allocations_after, stats.bytes_after
            ));
            console.write_str(&format!("{} bytes are available for use.\n", stats.free_after));
        }
        Ok(())
    }
}
