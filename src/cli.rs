// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Command-line surface for the `njvm` binary.

use std::path::PathBuf;

use clap::Parser;

/// Default stack size, in KiB.
pub const DEFAULT_STACK_KB: u32 = 64;

/// Default heap size, in KiB.
pub const DEFAULT_HEAP_KB: u32 = 8192;

/// Run or disassemble a Ninja bytecode file.
#[derive(Debug, Parser)]
#[command(name = "njvm", version, about, arg_required_else_help = true)]
pub struct Args {
    /// Path to the Ninja bytecode file (`.njbf`) to run.
    pub input: PathBuf,

    /// Print the disassembly of the loaded program and exit without running it.
    #[arg(long)]
    pub list: bool,

    /// Stack size in KiB.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_STACK_KB)]
    pub stack: u32,

    /// Heap size in KiB.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_HEAP_KB)]
    pub heap: u32,

    /// Zero the unused heap half after every collection.
    #[arg(long)]
    pub gcpurge: bool,

    /// Print allocation and free-space statistics around every collection.
    #[arg(long)]
    pub gcstats: bool,
}
