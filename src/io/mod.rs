// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! Byte-level I/O abstraction for `rdint`/`wrint`/`rdchr`/`wrchr`.
//!
//! The VM only ever needs to read and write single bytes; a trait keeps
//! the interpreter itself free of any dependency on real standard input
//! and output, so tests can drive a program against an in-memory buffer
//! instead.


use std::io::{self, Read, Write};

/// Blocking byte-level console used by the I/O opcodes.
pub trait Console {
    /// Read one byte, or `None` at end of input.
    fn read_byte(&mut self) -> Option<u8>;

    /// Write one byte.
    fn write_byte(&mut self, byte: u8);

    /// Write a string, one byte at a time.
    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }
}

/// The real console: standard input and standard output.
pub struct StdConsole {
    stdin: io::Bytes<io::StdinLock<'static>>,
    stdout: io::Stdout,
}

impl StdConsole {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdin: io::stdin().lock().bytes(),
            stdout: io::stdout(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.stdin.next().and_then(Result::ok)
    }

    fn write_byte(&mut self, byte: u8) {
        // Standard output is line-buffered; a fatal VM error later on still
        // wants everything written so far to have reached the terminal.
        let _ = self.stdout.write_all(&[byte]);
        let _ = self.stdout.flush();
    }
}

/// An in-memory console for tests: reads from a fixed input buffer and
/// records everything written.
#[derive(Default)]
pub struct MockConsole {
    input: std::collections::VecDeque<u8>,
    output: Vec<u8>,
}

impl MockConsole {
    #[must_use]
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    #[must_use]
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for MockConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }
}
