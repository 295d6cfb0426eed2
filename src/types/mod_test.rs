// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

use super::HeapAddr;

#[test]
fn new_roundtrips_through_as_u32() {
    let addr = HeapAddr::new(1234);
    assert_eq!(addr.as_u32(), 1234);
    assert_eq!(addr.as_usize(), 1234);
}

#[test]
fn from_raw_decodes_nil_sentinel() {
    assert_eq!(HeapAddr::from_raw(u32::MAX), None);
}

#[test]
fn from_raw_decodes_real_address() {
    assert_eq!(HeapAddr::from_raw(42), Some(HeapAddr::new(42)));
}

#[test]
fn to_raw_roundtrips() {
    let slot = Some(HeapAddr::new(7));
    assert_eq!(HeapAddr::from_raw(HeapAddr::to_raw(slot)), slot);
    assert_eq!(HeapAddr::from_raw(HeapAddr::to_raw(None)), None);
}

#[test]
fn debug_and_display_are_hex() {
    let addr = HeapAddr::new(0x10);
    assert_eq!(format!("{addr:?}"), "HeapAddr(0x10)");
    assert_eq!(format!("{addr}"), "0x10");
}
