//! Core Settings struct and implementations.

use super::{GeneratorSettings, NativeSource, PackageSettings, RelocationSettings};
use crate::bundler::{PlatformClass, PlatformPolicy};
use std::path::{Path, PathBuf};

/// Main settings for a pipeline run.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder) or loaded from a
/// `bundle.toml` through [`crate::metadata::load_settings`].
///
/// # Examples
///
/// ```no_run
/// use ffi_bundler::bundler::{SettingsBuilder, settings::PackageSettings};
///
/// # fn example() -> ffi_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .package_settings(PackageSettings {
///         name: "einvoice".into(),
///         manifest_path: "../../Cargo.toml".into(),
///         language: "kotlin".into(),
///     })
///     .output_directory("build/libs")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    package: PackageSettings,
    generator: GeneratorSettings,
    compile_command: Option<Vec<String>>,
    natives: Vec<NativeSource>,
    relocation: RelocationSettings,

    /// Shared tree where native binaries are staged per platform class.
    staging_directory: PathBuf,

    /// Where compiled host code is written before packaging.
    classes_directory: PathBuf,

    /// Where the final archive and report are written.
    output_directory: PathBuf,

    platform_policy: PlatformPolicy,

    /// None means "the build host's class only".
    required_platforms: Option<Vec<PlatformClass>>,

    /// OS identifier fed to the platform probe.
    host_os: String,
}

impl Settings {
    /// Returns the package name.
    pub fn package_name(&self) -> &str {
        &self.package.name
    }

    /// Returns the native manifest path.
    pub fn manifest_path(&self) -> &Path {
        &self.package.manifest_path
    }

    /// Returns the binding target language.
    pub fn language(&self) -> &str {
        &self.package.language
    }

    /// Returns the generator settings.
    pub fn generator(&self) -> &GeneratorSettings {
        &self.generator
    }

    /// Returns the host compile command, if any.
    pub fn compile_command(&self) -> Option<&[String]> {
        self.compile_command.as_deref()
    }

    /// Returns the native binary sources.
    pub fn natives(&self) -> &[NativeSource] {
        &self.natives
    }

    /// Returns the relocation settings.
    pub fn relocation(&self) -> &RelocationSettings {
        &self.relocation
    }

    /// Returns the native staging directory.
    pub fn staging_directory(&self) -> &Path {
        &self.staging_directory
    }

    /// Returns the staging tree for one version.
    ///
    /// Natives staged for one version never satisfy another, so a rebuilt
    /// library cannot be shadowed by a binary left from an earlier release.
    pub fn staging_directory_for(&self, version: &str) -> PathBuf {
        self.staging_directory.join(version)
    }

    /// Returns the compiled-classes directory.
    pub fn classes_directory(&self) -> &Path {
        &self.classes_directory
    }

    /// Returns the output directory.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Returns the platform policy.
    pub fn platform_policy(&self) -> PlatformPolicy {
        self.platform_policy
    }

    /// Returns the explicitly required platforms.
    pub fn required_platforms(&self) -> Option<&[PlatformClass]> {
        self.required_platforms.as_deref()
    }

    /// Returns the host OS identifier.
    pub fn host_os(&self) -> &str {
        &self.host_os
    }

    /// Returns the path of the final archive for `version`.
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.output_directory
            .join(format!("{}-{}.jar", self.package.name, version))
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        package: PackageSettings,
        generator: GeneratorSettings,
        compile_command: Option<Vec<String>>,
        natives: Vec<NativeSource>,
        relocation: RelocationSettings,
        staging_directory: PathBuf,
        classes_directory: PathBuf,
        output_directory: PathBuf,
        platform_policy: PlatformPolicy,
        required_platforms: Option<Vec<PlatformClass>>,
        host_os: String,
    ) -> Self {
        Self {
            package,
            generator,
            compile_command,
            natives,
            relocation,
            staging_directory,
            classes_directory,
            output_directory,
            platform_policy,
            required_platforms,
            host_os,
        }
    }
}
