//! `assemble`: stage one job's native binaries into a shared tree.

use super::summarize_warnings;
use crate::bundler::{assembler::ArtifactAssembler, assembler::archive::export_tree};
use crate::cli::{Args, AssembleArgs, RuntimeConfig};
use crate::error::{CliError, Result};
use crate::metadata::{load_settings, resolve_version};

/// Merges the given sources into the staging tree and optionally exports it.
pub async fn execute(args: &Args, assemble: &AssembleArgs, config: &RuntimeConfig) -> Result<i32> {
    config.section("Assembling native binaries");

    // The configuration is optional when every input is given as a flag
    let settings = match load_settings(&args.config) {
        Ok(settings) => Some(settings),
        Err(e) if assemble.staging_dir.is_some() && !assemble.from.is_empty() => {
            config.verbose_println(&format!("Configuration not used: {e}"));
            None
        }
        Err(e) => return Err(e.into()),
    };

    let staging_dir = match (&assemble.staging_dir, &settings) {
        (Some(dir), _) => dir.clone(),
        (None, Some(settings)) => {
            let version = resolve_version(settings.manifest_path())?;
            settings.staging_directory_for(&version)
        }
        (None, None) => {
            return Err(CliError::MissingArgument {
                argument: "--staging-dir".to_string(),
            }
            .into());
        }
    };
    let library = assemble
        .library
        .clone()
        .or_else(|| settings.as_ref().map(|s| s.generator().library.clone()))
        .unwrap_or_default();
    let sources = if assemble.from.is_empty() {
        settings
            .as_ref()
            .map(|s| s.natives().to_vec())
            .unwrap_or_default()
    } else {
        assemble.from.clone()
    };

    let assembler = ArtifactAssembler::new(&staging_dir, library);
    for source in &sources {
        config.progress(&format!("{} from {}", source.platform, source.location.display()));
    }
    let report = assembler.merge(&sources).await?;

    for staged in &report.staged {
        config.success(&format!("Staged {} ({})", staged.entry_name(), staged.sha256));
    }
    if report.staged.is_empty() {
        config.progress("Nothing new to stage");
    }

    if let Some(export) = &assemble.export {
        export_tree(&staging_dir, export).await?;
        config.success(&format!("Exported {}", export.display()));
    }

    summarize_warnings(&report.warnings, config);
    Ok(0)
}
