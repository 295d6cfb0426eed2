// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

use super::Header;

#[test]
fn integer_header_reports_size_and_payload() {
    let header = Header::new(false, 8);
    assert!(!header.is_compound());
    assert!(!header.is_copied());
    assert_eq!(header.size(), 8);
    assert_eq!(header.payload_size(), 8);
}

#[test]
fn compound_header_reports_member_count_and_payload() {
    let header = Header::new(true, 3);
    assert!(header.is_compound());
    assert_eq!(header.size(), 3);
    assert_eq!(header.payload_size(), 3 * 4);
}

#[test]
fn forwarded_header_exposes_offset_not_size() {
    let header = Header::forwarded(0x1234);
    assert!(header.is_copied());
    assert_eq!(header.forwarding_offset(), 0x1234);
}

#[test]
fn bits_roundtrip() {
    let header = Header::new(true, 42);
    assert_eq!(Header::from_bits(header.to_bits()), header);
}

#[test]
fn max_object_size_is_thirty_bits() {
    assert_eq!(Header::MAX_OBJECT_SIZE, (1 << 30) - 1);
    let header = Header::new(false, Header::MAX_OBJECT_SIZE);
    assert_eq!(header.size(), Header::MAX_OBJECT_SIZE);
}
