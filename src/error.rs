// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Error taxonomy for the loader and the running machine.
//!
//! Every error surfaced from here is fatal to the current run: nothing in
//! the Ninja instruction set can catch or recover from one. The variants
//! exist to give the top-level driver a precise message, not to support
//! retry logic.

use std::io;
use std::path::PathBuf;

/// Failures that can occur while reading a bytecode file.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("could not open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{0}' is not a Ninja bytecode file (bad magic)")]
    BadMagic(PathBuf),

    #[error("bytecode version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("unexpected end of file while reading '{0}'")]
    ShortRead(PathBuf),
}

/// Failures that can occur while decoding or running bytecode.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("program counter out of bounds")]
    ProgramCounterOutOfBounds,

    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack index {0} out of range")]
    StackIndexOutOfRange(i32),

    #[error("static data index {0} out of range")]
    GlobalIndexOutOfRange(i32),

    #[error("stack slot holds a {actual}, expected a {expected}")]
    SlotTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("dereferenced nil reference")]
    NilDereference,

    #[error("member access on a non-compound object")]
    NotCompound,

    #[error("member index {0} out of range")]
    IndexOutOfRange(i32),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed integer literal: '{0}'")]
    MalformedInteger(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
