//! `package`: the full pipeline.

use super::summarize_warnings;
use crate::bundler::{
    PackageDriver, PlatformPolicy,
    generator::{CommandGenerator, LineSink},
};
use crate::cli::{Args, PackageArgs, RuntimeConfig};
use crate::error::Result;
use crate::metadata::load_settings_builder;
use std::sync::Arc;
use std::time::Duration;

/// Runs the pipeline and prints the archive path on stdout.
pub async fn execute(args: &Args, package: &PackageArgs, config: &RuntimeConfig) -> Result<i32> {
    config.section("Packaging");
    config.verbose_println(&format!("Configuration: {}", args.config.display()));

    let mut builder = load_settings_builder(&args.config)?;
    if let Some(dir) = &package.output_dir {
        builder = builder.output_directory(dir);
    }
    if package.strict_platform {
        builder = builder.platform_policy(PlatformPolicy::Strict);
    }
    if !package.require.is_empty() {
        builder = builder.required_platforms(package.require.clone());
    }
    if let Some(secs) = package.generator_timeout {
        builder = builder.generator_timeout(Duration::from_secs(secs));
    }
    let settings = builder.build()?;

    config.progress(&format!(
        "Generating {} bindings with {}",
        settings.language(),
        settings.generator().program.display()
    ));
    let output = *config.output();
    let sink: LineSink = Arc::new(move |_, line| {
        let _ = output.indent(line);
    });
    let generator = Arc::new(CommandGenerator::new(settings.generator()).with_output(sink));

    let mut driver = PackageDriver::new(settings, generator)?;
    let artifact = driver.run().await?;

    for native in &artifact.platforms {
        config.verbose_println(&format!("{} ({})", native.entry_name(), native.sha256));
    }
    config.success(&format!(
        "Packaged {} version {} ({} bytes)",
        artifact.archive_path.display(),
        artifact.version,
        artifact.size
    ));
    config.verbose_println(&format!("SHA256: {}", artifact.sha256));
    config.verbose_println(&format!("Report: {}", artifact.report_path.display()));
    summarize_warnings(&artifact.warnings, config);

    println!("{}", artifact.archive_path.display());
    Ok(0)
}
