// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! The bridge between the heap's integer objects and arbitrary-precision
//! arithmetic.
//!
//! The reference machine treats its big-integer library as an opaque
//! external service that issues an allocation callback
//! (`newPrimObject(dataSize)`) whenever it needs to materialize a result.
//! Here the roles are reversed but the contract is the same: [`num_bigint`]
//! does the arithmetic in a scratch [`BigInt`], and this module is the only
//! place that turns those scratch values into heap objects (via
//! [`crate::vm::Vm::halloc`]) or reads them back out. Every VM opcode that
//! touches a bigint goes through `read`/`write` here rather than poking at
//! heap bytes directly.


use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::error::VmError;
use crate::io::Console;
use crate::types::ObjRef;
use crate::vm::Vm;

/// Read the integer object `r` refers to as a [`BigInt`].
///
/// # Errors
/// Returns [`VmError::NilDereference`] if `r` is nil, or
/// [`VmError::InvalidArgument`] if it refers to a compound object.
pub fn read<C: Console>(vm: &Vm<C>, r: ObjRef) -> Result<BigInt, VmError> {
    let addr = r.ok_or(VmError::NilDereference)?;
    let header = vm.heap.header_of(addr);
    if header.is_compound() {
        return Err(VmError::InvalidArgument(
            "expected an integer object, found a compound object".to_owned(),
        ));
    }
    Ok(BigInt::from_signed_bytes_le(vm.heap.integer_payload(addr)))
}

/// Allocate a fresh integer object holding `value` and return a reference
/// to it.
///
/// # Errors
/// Propagates [`VmError::OutOfMemory`] from the allocator.
pub fn write<C: Console>(vm: &mut Vm<C>, value: &BigInt) -> Result<ObjRef, VmError> {
    let bytes = value.to_signed_bytes_le();
    let size = u32::try_from(bytes.len())
        .map_err(|_| VmError::InvalidArgument("integer too large to represent".to_owned()))?;
    let addr = vm.halloc(false, size)?;
    vm.heap.write_integer_payload(addr, &bytes);
    Ok(Some(addr))
}

/// Convert a [`BigInt`] to an `i32`, used by opcodes that index memory
/// (`newa`, `getfa`, `putfa`) or emit a character (`wrchr`).
///
/// # Errors
/// Returns [`VmError::InvalidArgument`] if `value` doesn't fit in 32 bits.
pub fn to_i32(value: &BigInt) -> Result<i32, VmError> {
    value
        .to_i32()
        .ok_or_else(|| VmError::InvalidArgument(format!("{value} does not fit in 32 bits")))
}
