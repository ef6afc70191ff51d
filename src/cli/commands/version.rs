//! `version`: print the manifest version.

use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use crate::metadata::{load_settings, resolve_version};

/// Prints the version the package would carry.
pub fn execute(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let settings = load_settings(&args.config)?;
    config.verbose_println(&format!("Manifest: {}", settings.manifest_path().display()));

    let version = resolve_version(settings.manifest_path())?;
    println!("{version}");
    Ok(0)
}
