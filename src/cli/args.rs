//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with validation
//! and the runtime configuration derived from it.

use crate::bundler::{PlatformClass, settings::NativeSource};
use crate::metadata::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Packages a native library with generated bindings into one artifact
#[derive(Parser, Debug)]
#[command(
    name = "ffi_bundler",
    version,
    about = "Packages a native library with generated bindings into one multi-platform artifact",
    long_about = "Resolves the native library's version, generates host-language bindings, compiles them, \
stages one native binary per platform class, relocates bundled dependencies and writes a single archive.

Usage:
  ffi_bundler package
  ffi_bundler --config bindings/kotlin/bundle.toml package --output-dir dist
  ffi_bundler assemble --from linux-x86-64=target/release --export linux-natives.tar.gz
  ffi_bundler version

Exit code 0 = archive guaranteed to exist at the printed path."
)]
pub struct Args {
    /// Bundle configuration file
    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_FILE,
        env = "FFI_BUNDLER_CONFIG"
    )]
    pub config: PathBuf,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and write the archive
    Package(PackageArgs),
    /// Stage native binaries into a shared tree (release-matrix fan-in)
    Assemble(AssembleArgs),
    /// Print the version resolved from the native manifest
    Version,
}

/// Flags for `package`.
#[derive(clap::Args, Debug, Default)]
pub struct PackageArgs {
    /// Output directory for the archive and report
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Fail on build hosts outside the platform table instead of falling back
    #[arg(long)]
    pub strict_platform: bool,

    /// Platform that must have a staged binary (repeatable)
    #[arg(long = "require", value_name = "PLATFORM", value_parser = parse_platform)]
    pub require: Vec<PlatformClass>,

    /// Kill the binding generator after this many seconds
    #[arg(long, value_name = "SECS")]
    pub generator_timeout: Option<u64>,
}

/// Flags for `assemble`.
#[derive(clap::Args, Debug, Default)]
pub struct AssembleArgs {
    /// Native source as PLATFORM=PATH, PATH being a directory or .tar.gz (repeatable)
    ///
    /// Defaults to the [[natives]] entries of the configuration.
    #[arg(long = "from", value_name = "PLATFORM=PATH", value_parser = parse_native_source)]
    pub from: Vec<NativeSource>,

    /// Staging tree to merge into
    ///
    /// Defaults to the configured staging directory for the manifest version.
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Native library name without prefix or extension
    #[arg(long, value_name = "NAME")]
    pub library: Option<String>,

    /// Also write the staged tree as a .tar.gz for another job
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

fn parse_platform(value: &str) -> Result<PlatformClass, String> {
    value.parse().map_err(|e: crate::bundler::Error| e.to_string())
}

fn parse_native_source(value: &str) -> Result<NativeSource, String> {
    let (platform, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PLATFORM=PATH, got `{value}`"))?;
    if path.is_empty() {
        return Err(format!("missing path in `{value}`"));
    }
    Ok(NativeSource::new(parse_platform(platform)?, path))
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.config.as_os_str().is_empty() {
            return Err("Config path cannot be empty".to_string());
        }

        match &self.command {
            Command::Package(package) => {
                if package.generator_timeout == Some(0) {
                    return Err("Generator timeout must be at least one second".to_string());
                }
            }
            Command::Assemble(assemble) => {
                if let Some(export) = &assemble.export {
                    let name = export.to_string_lossy();
                    if !(name.ends_with(".tar.gz") || name.ends_with(".tgz")) {
                        return Err(format!(
                            "Export path must end in .tar.gz or .tgz: {}",
                            export.display()
                        ));
                    }
                }
            }
            Command::Version => {}
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print warning message
    pub fn warn(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message if not in quiet mode
    pub fn success(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print progress message
    pub fn progress(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_sources_parse_from_flags() {
        let args = Args::try_parse_from([
            "ffi_bundler",
            "assemble",
            "--from",
            "linux-x86-64=target/release",
            "--from",
            "darwin-aarch64=mac-natives.tar.gz",
            "--export",
            "out.tar.gz",
        ])
        .unwrap();

        let Command::Assemble(assemble) = &args.command else {
            panic!("expected assemble");
        };
        assert_eq!(
            assemble.from,
            vec![
                NativeSource::new(PlatformClass::LinuxX86_64, "target/release"),
                NativeSource::new(PlatformClass::DarwinAarch64, "mac-natives.tar.gz"),
            ]
        );
        assert!(args.validate().is_ok());
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let result = Args::try_parse_from(["ffi_bundler", "assemble", "--from", "windows-x64=out"]);
        assert!(result.is_err());
    }

    #[test]
    fn export_must_be_a_tarball() {
        let args =
            Args::try_parse_from(["ffi_bundler", "assemble", "--export", "natives.zip"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let args = Args::try_parse_from(["ffi_bundler", "package", "-c", "k/bundle.toml", "--require", "linux-x86-64"])
            .unwrap();
        assert_eq!(args.config, PathBuf::from("k/bundle.toml"));
        let Command::Package(package) = &args.command else {
            panic!("expected package");
        };
        assert_eq!(package.require, [PlatformClass::LinuxX86_64]);
    }
}
