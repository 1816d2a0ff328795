mod args;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use args::Args;
use commands::Outcome;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // RUST_LOG wins over -v
    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(args.config.as_deref())?;
    match commands::run(args.command, &config)? {
        Outcome::Success => Ok(ExitCode::SUCCESS),
        Outcome::Rejected => Ok(ExitCode::FAILURE),
    }
}
