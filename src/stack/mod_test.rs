// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

use super::{Slot, Stack};
use crate::types::HeapAddr;

#[test]
fn push_pop_reference_roundtrips() {
    let mut stack = Stack::new(4);
    stack.push_ref(Some(HeapAddr::new(7))).unwrap();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.pop_ref().unwrap(), Some(HeapAddr::new(7)));
    assert_eq!(stack.len(), 0);
}

#[test]
fn push_pop_primitive_roundtrips() {
    let mut stack = Stack::new(4);
    stack.push_prim(-5).unwrap();
    assert_eq!(stack.pop_prim().unwrap(), -5);
}

#[test]
fn pop_ref_on_primitive_slot_is_type_mismatch() {
    let mut stack = Stack::new(4);
    stack.push_prim(1).unwrap();
    let err = stack.pop_ref().unwrap_err();
    assert!(matches!(err, crate::error::VmError::SlotTypeMismatch { .. }));
}

#[test]
fn push_beyond_capacity_overflows() {
    let mut stack = Stack::new(1);
    stack.push_ref(None).unwrap();
    let err = stack.push_ref(None).unwrap_err();
    assert!(matches!(err, crate::error::VmError::StackOverflow));
}

#[test]
fn pop_empty_underflows() {
    let mut stack = Stack::new(1);
    let err = stack.pop().unwrap_err();
    assert!(matches!(err, crate::error::VmError::StackUnderflow));
}

#[test]
fn drop_n_shrinks_stack_pointer() {
    let mut stack = Stack::new(4);
    stack.push_ref(None).unwrap();
    stack.push_ref(None).unwrap();
    stack.push_ref(None).unwrap();
    stack.drop_n(2).unwrap();
    assert_eq!(stack.len(), 1);
}

#[test]
fn drop_n_negative_is_invalid_argument() {
    let mut stack = Stack::new(4);
    let err = stack.drop_n(-1).unwrap_err();
    assert!(matches!(err, crate::error::VmError::InvalidArgument(_)));
}

#[test]
fn get_and_set_operate_on_absolute_indices() {
    let mut stack = Stack::new(4);
    stack.push_ref(None).unwrap();
    stack.push_ref(None).unwrap();
    stack.set(0, Slot::reference(Some(HeapAddr::new(3)))).unwrap();
    assert_eq!(stack.get(0).unwrap(), Slot::reference(Some(HeapAddr::new(3))));
}

#[test]
fn get_negative_index_is_out_of_range() {
    let stack = Stack::new(4);
    let err = stack.get(-1).unwrap_err();
    assert!(matches!(err, crate::error::VmError::StackIndexOutOfRange(-1)));
}

#[test]
fn truncate_discards_locals_and_temporaries() {
    let mut stack = Stack::new(8);
    for _ in 0..5 {
        stack.push_ref(None).unwrap();
    }
    stack.truncate(2).unwrap();
    assert_eq!(stack.len(), 2);
}

#[test]
fn roots_mut_only_yields_reference_slots() {
    let mut stack = Stack::new(4);
    stack.push_ref(Some(HeapAddr::new(1))).unwrap();
    stack.push_prim(99).unwrap();
    stack.push_ref(Some(HeapAddr::new(2))).unwrap();
    let roots: Vec<_> = stack.roots_mut().map(|r| r.unwrap()).collect();
    assert_eq!(roots, vec![HeapAddr::new(1), HeapAddr::new(2)]);
}
