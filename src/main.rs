//! simforge - build tool for the falling-sand simulation

use std::process::ExitCode;

use simforge::cli;

fn main() -> ExitCode {
    cli::run()
}
