// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Heap address representation.
//!
//! Unlike a native pointer, a [`HeapAddr`] is a byte offset relative to
//! whichever heap half is currently active. The same numeric offset refers
//! to different absolute bytes before and after a collection, which is
//! exactly what lets the garbage collector swap halves without rewriting
//! every address in existence.

#[cfg(test)]
mod mod_test;

use core::fmt;

/// Offset of a heap object from the base of the active half.
///
/// `nil` is represented at the type level by `Option<HeapAddr>` ([`ObjRef`])
/// rather than by a reserved address, so every reference that isn't nil is
/// guaranteed to be a real, in-bounds offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HeapAddr(u32);

impl HeapAddr {
    /// Sentinel raw value used on the wire (inside a compound object's
    /// payload) to represent `nil`. Never a valid offset because heap halves
    /// are configured in kilobytes and can't grow this large.
    const NIL_SENTINEL: u32 = u32::MAX;

    /// Create an address at the given byte offset.
    #[inline]
    #[must_use]
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Decode a raw on-heap reference, translating the nil sentinel to `None`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> ObjRef {
        if raw == Self::NIL_SENTINEL {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Encode an [`ObjRef`] as it is stored inside a compound object's payload.
    #[inline]
    #[must_use]
    pub const fn to_raw(slot: ObjRef) -> u32 {
        match slot {
            Some(addr) => addr.0,
            None => Self::NIL_SENTINEL,
        }
    }
}

impl fmt::Debug for HeapAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapAddr({:#x})", self.0)
    }
}

impl fmt::Display for HeapAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An object reference: either `nil` or a byte offset into the active half.
pub type ObjRef = Option<HeapAddr>;
