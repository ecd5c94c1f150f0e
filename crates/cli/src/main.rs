// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use barsync::Cli;
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    barsync::logging::init(cli.verbose);
    if let Err(e) = barsync::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
