// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_cli::{Cli, init_logging, run};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();
    let result = init_logging(cli.log_level.as_deref()).and_then(|()| run(cli));
    if let Err(err) = result {
        eprintln!("{}", err.envelope());
        process::exit(1);
    }
}
