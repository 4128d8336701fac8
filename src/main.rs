use std::process::ExitCode;

use clap::Parser;

use bento::cli::{self, CliArgs};
use bento::logger;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();
    bento::log_info!("bento {} starting", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse();
    cli::run(args)
}
