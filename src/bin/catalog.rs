//! Catalog CLI Binary
//!
//! Command-line entry point for the product catalog service.

use anyhow::Context;
use catalog::logging::init_logging;
use catalog::tooling::cli::{Cli, CliContext};
use clap::Parser;
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let mut context = CliContext::new(cli.root.clone(), cli.config.clone())
        .context("Failed to load configuration")?;
    context.apply_log_overrides(cli);
    init_logging(Some(&context.config().logging)).context("Failed to initialize logging")?;

    context
        .execute(&cli.command)
        .context("Command failed")
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
