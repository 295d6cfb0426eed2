// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 Tobias Sarnowski <tobias@sarnowski.cloud>

//! `njvm` — the Ninja bytecode virtual machine's command-line front end.

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;

use njvm::cli::Args;
use njvm::disassemble::disassemble;
use njvm::io::StdConsole;
use njvm::loader;
use njvm::vm::Vm;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_env("NJVM_LOG").unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: &Args) -> anyhow::Result<()> {
    let program = loader::load(&args.input).context("failed to load bytecode file")?;

    if args.list {
        print!("{}", disassemble(&program.instructions)?);
        return Ok(());
    }

    let mut vm = Vm::new(
        program.instructions,
        program.static_data,
        args.stack,
        args.heap,
        args.gcpurge,
        args.gcstats,
        StdConsole::new(),
    )?;

    println!("Ninja Virtual Machine started");
    vm.run()?;
    println!("Ninja Virtual Machine stopped");

    Ok(())
}
