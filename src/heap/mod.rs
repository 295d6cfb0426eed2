// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! The two-space heap and its stop-the-world copying collector.
//!
//! The heap is one contiguous buffer split into two equal halves. Objects
//! are bump-allocated in whichever half is currently active; the other
//! half sits idle until the next collection. A collection swaps the two
//! halves and copies every object reachable from the root set into the
//! half that was previously idle, using the classic Cheney two-cursor
//! scan rather than call-stack recursion, so that long chains of compound
//! objects can't blow the host stack.


use crate::error::VmError;
use crate::object::{HEADER_BYTES, Header, REF_BYTES};
use crate::types::{HeapAddr, ObjRef};

/// Statistics captured around a single collection, used for `--gcstats`.
#[derive(Debug, Clone, Copy)]
pub struct GcStats {
    pub allocations_before: u32,
    pub bytes_before: u32,
    pub allocations_after: u32,
    pub bytes_after: u32,
    pub free_after: u32,
}

/// The heap: a single owned buffer partitioned into an active and an
/// unused half.
pub struct Heap {
    buffer: Box<[u8]>,
    half_bytes: u32,
    active_is_first: bool,
    bytes_used: u32,
    allocations: u32,
}

impl Heap {
    /// Build a heap of `heap_kb` kilobytes, split evenly into two halves.
    ///
    /// # Errors
    /// Returns [`VmError::InvalidArgument`] if `heap_kb` is zero or doesn't
    /// fit a whole number of bytes into two equal halves.
    pub fn new(heap_kb: u32) -> Result<Self, VmError> {
        let total_bytes = u64::from(heap_kb) * 1024;
        let half_bytes = u32::try_from(total_bytes / 2)
            .map_err(|_| VmError::InvalidArgument("heap size overflows a 32-bit half".to_owned()))?;
        if half_bytes == 0 {
            return Err(VmError::InvalidArgument("heap size must be at least 2 KiB".to_owned()));
        }
        let buffer = vec![0u8; half_bytes as usize * 2].into_boxed_slice();
        Ok(Self {
            buffer,
            half_bytes,
            active_is_first: true,
            bytes_used: 0,
            allocations: 0,
        })
    }

    #[inline]
    #[must_use]
    pub const fn half_bytes(&self) -> u32 {
        self.half_bytes
    }

    #[inline]
    #[must_use]
    pub const fn bytes_used(&self) -> u32 {
        self.bytes_used
    }

    #[inline]
    #[must_use]
    pub const fn allocations(&self) -> u32 {
        self.allocations
    }

    #[inline]
    #[must_use]
    pub const fn free_bytes(&self) -> u32 {
        self.half_bytes - self.bytes_used
    }

    #[inline]
    fn active_base(&self) -> usize {
        if self.active_is_first { 0 } else { self.half_bytes as usize }
    }

    fn read_u32_at(&self, offset: usize) -> u32 {
        let bytes: [u8; 4] = self.buffer[offset..offset + 4].try_into().expect("4-byte slice");
        u32::from_le_bytes(bytes)
    }

    fn write_u32_at(&mut self, offset: usize, value: u32) {
        self.buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn header_at(&self, base: usize, addr: HeapAddr) -> Header {
        Header::from_bits(self.read_u32_at(base + addr.as_usize()))
    }

    fn set_header_at(&mut self, base: usize, addr: HeapAddr, header: Header) {
        self.write_u32_at(base + addr.as_usize(), header.to_bits());
    }

    fn payload_offset(base: usize, addr: HeapAddr) -> usize {
        base + addr.as_usize() + HEADER_BYTES as usize
    }

    /// The header of a live object in the active half.
    #[must_use]
    pub fn header_of(&self, addr: HeapAddr) -> Header {
        self.header_at(self.active_base(), addr)
    }

    /// Read a reference member of a compound object. Caller must have
    /// already validated `index` against the object's size.
    #[must_use]
    pub fn member(&self, addr: HeapAddr, index: u32) -> ObjRef {
        let offset = Self::payload_offset(self.active_base(), addr) + index as usize * REF_BYTES as usize;
        HeapAddr::from_raw(self.read_u32_at(offset))
    }

    /// Overwrite a reference member of a compound object.
    pub fn set_member(&mut self, addr: HeapAddr, index: u32, value: ObjRef) {
        let offset = Self::payload_offset(self.active_base(), addr) + index as usize * REF_BYTES as usize;
        self.write_u32_at(offset, HeapAddr::to_raw(value));
    }

    /// The raw payload bytes of an integer object, interpreted by the
    /// bigint bridge as a signed little-endian integer.
    #[must_use]
    pub fn integer_payload(&self, addr: HeapAddr) -> &[u8] {
        let header = self.header_of(addr);
        let start = Self::payload_offset(self.active_base(), addr);
        &self.buffer[start..start + header.size() as usize]
    }

    /// Overwrite the payload of a freshly allocated integer object. `bytes`
    /// must fit exactly within the object's declared size.
    pub fn write_integer_payload(&mut self, addr: HeapAddr, bytes: &[u8]) {
        let start = Self::payload_offset(self.active_base(), addr);
        self.buffer[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Bump-allocate `total` bytes (header + payload) for a new object in
    /// the active half, or return `None` if there isn't room. Does not run
    /// the collector; callers retry after a collection. A compound
    /// object's members are nil-filled before being handed back, matching
    /// the spec's "all members initialised to nil".
    ///
    /// # Errors
    /// Returns [`VmError::InvalidArgument`] if `size` exceeds
    /// [`Header::MAX_OBJECT_SIZE`] or the object can never fit in a half
    /// regardless of collection.
    pub fn try_alloc(&mut self, compound: bool, size: u32) -> Result<Option<HeapAddr>, VmError> {
        if size > Header::MAX_OBJECT_SIZE {
            return Err(VmError::InvalidArgument(format!(
                "object size {size} exceeds the maximum of {}",
                Header::MAX_OBJECT_SIZE
            )));
        }
        let payload = if compound { u64::from(size) * u64::from(REF_BYTES) } else { u64::from(size) };
        let total = u64::from(HEADER_BYTES) + payload;
        if total > u64::from(self.half_bytes) {
            return Err(VmError::InvalidArgument(format!(
                "object of {total} bytes can never fit in a {}-byte heap half",
                self.half_bytes
            )));
        }
        let total = total as u32;
        if total > self.half_bytes - self.bytes_used {
            return Ok(None);
        }
        let base = self.active_base();
        let addr = HeapAddr::new(self.bytes_used);
        self.bytes_used += total;
        self.allocations += 1;
        self.set_header_at(base, addr, Header::new(compound, size));
        if compound {
            for index in 0..size {
                self.set_member(addr, index, None);
            }
        }
        Ok(Some(addr))
    }

    fn zero_range(&mut self, base: usize, len: usize) {
        self.buffer[base..base + len].fill(0);
    }

    /// Run a full stop-the-world collection, rescuing every root and
    /// everything reachable from them into the half that was idle.
    ///
    /// # Errors
    /// Returns [`VmError::OutOfMemory`] if the reachable set somehow
    /// doesn't fit in a single half — a sign the heap was undersized for
    /// its working set, not a recoverable condition.
    pub fn collect<'a>(
        &mut self,
        roots: impl Iterator<Item = &'a mut ObjRef>,
        purge: bool,
    ) -> Result<GcStats, VmError> {
        let allocations_before = self.allocations;
        let bytes_before = self.bytes_used;

        self.bytes_used = 0;
        self.allocations = 0;
        let from_base = self.active_base();
        self.active_is_first = !self.active_is_first;
        let to_base = self.active_base();

        for root in roots {
            self.rescue(root, from_base, to_base)?;
        }

        // Cheney scan: walk the to-space we've copied into so far, rescuing
        // the members of every compound object we find. Rescuing may append
        // further copies past `scan`, so the scan cursor chases the
        // allocation cursor (`bytes_used`) until they meet.
        let mut scan: u32 = 0;
        while scan < self.bytes_used {
            let addr = HeapAddr::new(scan);
            let header = self.header_at(to_base, addr);
            if header.is_compound() {
                for index in 0..header.size() {
                    let offset = Self::payload_offset(to_base, addr) + index as usize * REF_BYTES as usize;
                    let mut member = HeapAddr::from_raw(self.read_u32_at(offset));
                    self.rescue(&mut member, from_base, to_base)?;
                    self.write_u32_at(offset, HeapAddr::to_raw(member));
                }
            }
            scan += HEADER_BYTES + header.payload_size();
        }

        if purge {
            self.zero_range(from_base, self.half_bytes as usize);
        }

        Ok(GcStats {
            allocations_before,
            bytes_before,
            allocations_after: self.allocations,
            bytes_after: self.bytes_used,
            free_after: self.free_bytes(),
        })
    }

    /// Rescue a single root location: copy its object (if not already
    /// copied) into the new active half and rewrite `slot` to point at the
    /// copy. Installing the forwarding reference before the Cheney scan
    /// visits the copy's members is what makes cyclic graphs safe: a
    /// second visit to the same original just follows the forwarding
    /// reference instead of copying again.
    fn rescue(&mut self, slot: &mut ObjRef, from_base: usize, to_base: usize) -> Result<(), VmError> {
        let Some(addr) = *slot else { return Ok(()) };

        let header = self.header_at(from_base, addr);
        if header.is_copied() {
            *slot = Some(HeapAddr::new(header.forwarding_offset()));
            return Ok(());
        }

        let total = HEADER_BYTES + header.payload_size();
        if total > self.half_bytes - self.bytes_used {
            return Err(VmError::OutOfMemory);
        }
        let copy_addr = HeapAddr::new(self.bytes_used);
        self.bytes_used += total;
        self.allocations += 1;
        self.set_header_at(to_base, copy_addr, header);
        self.set_header_at(from_base, addr, Header::forwarded(copy_addr.as_u32()));

        let payload_len = header.payload_size() as usize;
        let src = Self::payload_offset(from_base, addr);
        let dst = Self::payload_offset(to_base, copy_addr);
        self.buffer.copy_within(src..src + payload_len, dst);

        *slot = Some(copy_addr);
        Ok(())
    }
}
