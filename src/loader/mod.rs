// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Reads a Ninja bytecode file (`.njbf`) off disk into a program and an
//! empty static-data segment.
//!
//! Binary layout: a 16-byte header (magic `NJBF`, `version`,
//! `instruction_count`, `static_vars_count`, all little-endian `u32`s)
//! followed by `instruction_count` 32-bit instruction words.


use std::fs;
use std::path::Path;

use crate::error::LoaderError;
use crate::types::ObjRef;

const MAGIC: &[u8; 4] = b"NJBF";
const HEADER_BYTES: usize = 16;
const SUPPORTED_VERSION: u32 = 8;

/// A loaded program: the instruction stream and an (empty, nil-filled)
/// static-data segment sized from the file header.
#[derive(Debug, Clone)]
pub struct Program {
    pub instructions: Vec<u32>,
    pub static_data: Vec<ObjRef>,
}

/// Load a Ninja bytecode file.
///
/// # Errors
/// Returns [`LoaderError::Open`] if the file can't be read,
/// [`LoaderError::BadMagic`] if the header doesn't start with `NJBF`,
/// [`LoaderError::UnsupportedVersion`] if the file's version is newer than
/// [`SUPPORTED_VERSION`], or [`LoaderError::ShortRead`] if the file is
/// truncated relative to its own header.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>) -> Result<Program, LoaderError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoaderError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.len() < HEADER_BYTES {
        return Err(LoaderError::ShortRead(path.to_path_buf()));
    }

    if &bytes[0..4] != MAGIC {
        return Err(LoaderError::BadMagic(path.to_path_buf()));
    }

    let version = u32::from_le_bytes(bytes[4..8].try_into().expect("slice is 4 bytes"));
    if version > SUPPORTED_VERSION {
        return Err(LoaderError::UnsupportedVersion {
            found: version,
            supported: SUPPORTED_VERSION,
        });
    }

    let instruction_count = u32::from_le_bytes(bytes[8..12].try_into().expect("slice is 4 bytes")) as usize;
    let static_vars_count = u32::from_le_bytes(bytes[12..16].try_into().expect("slice is 4 bytes")) as usize;

    let body = &bytes[HEADER_BYTES..];
    let needed = instruction_count
        .checked_mul(4)
        .ok_or_else(|| LoaderError::ShortRead(path.to_path_buf()))?;
    if body.len() < needed {
        return Err(LoaderError::ShortRead(path.to_path_buf()));
    }

    let instructions = body[..needed]
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes(word.try_into().expect("chunk is 4 bytes")))
        .collect();

    tracing::debug!(instruction_count, static_vars_count, version, "loaded bytecode file");

    Ok(Program {
        instructions,
        static_data: vec![None; static_vars_count],
    })
}
