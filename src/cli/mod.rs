//! Command line interface for ffi_bundler.
//!
//! This module provides the CLI for pipeline operations, with argument
//! parsing, command execution, and user feedback.

mod args;
pub mod commands;
mod output;

pub use args::{Args, AssembleArgs, Command, PackageArgs, RuntimeConfig};
pub use output::OutputManager;

use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(&args).await
}

/// Executes already-parsed arguments.
pub async fn execute(args: &Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;
    let config = RuntimeConfig::from(args);

    match &args.command {
        Command::Package(package) => commands::package::execute(args, package, &config).await,
        Command::Assemble(assemble) => commands::assemble::execute(args, assemble, &config).await,
        Command::Version => commands::version::execute(args, &config),
    }
}
