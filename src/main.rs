//! routes-from-source - check HTTP route descriptors against Rust source.
//!
//! # Usage
//!
//! ```bash
//! routes-from-source [OPTIONS] <DESCRIPTORS>
//! ```
//!
//! # Examples
//!
//! Resolve routes against the crate in the current directory:
//! ```bash
//! routes-from-source routes.json
//! ```
//!
//! Write a JSON report and fail if anything is unresolved:
//! ```bash
//! routes-from-source routes.json -s ./my-service -f json -o report.json --deny-unresolved
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use routes_from_source::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("routes-from-source starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
