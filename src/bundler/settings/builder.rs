//! Builder for constructing Settings.

use super::{GeneratorSettings, NativeSource, PackageSettings, RelocationSettings, Settings};
use crate::bundler::{PlatformClass, PlatformPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use ffi_bundler::bundler::{PlatformClass, SettingsBuilder};
/// use ffi_bundler::bundler::settings::{NativeSource, PackageSettings};
///
/// # fn example() -> ffi_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .package_settings(PackageSettings {
///         name: "einvoice".into(),
///         manifest_path: "Cargo.toml".into(),
///         language: "kotlin".into(),
///     })
///     .natives(vec![
///         NativeSource::new(PlatformClass::LinuxX86_64, "target/release"),
///         NativeSource::new(PlatformClass::DarwinAarch64, "target/release"),
///     ])
///     .output_directory("build/libs")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    package_settings: Option<PackageSettings>,
    generator: GeneratorSettings,
    compile_command: Option<Vec<String>>,
    natives: Vec<NativeSource>,
    relocation: RelocationSettings,
    staging_directory: Option<PathBuf>,
    classes_directory: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    platform_policy: PlatformPolicy,
    required_platforms: Option<Vec<PlatformClass>>,
    host_os: Option<String>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets package identity.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package_settings = Some(settings);
        self
    }

    /// Sets generator settings.
    ///
    /// Default: [`GeneratorSettings::default`]
    pub fn generator(mut self, settings: GeneratorSettings) -> Self {
        self.generator = settings;
        self
    }

    /// Sets the generator timeout, keeping the other generator settings.
    ///
    /// Default: None (wait indefinitely)
    pub fn generator_timeout(mut self, timeout: Duration) -> Self {
        self.generator.timeout = Some(timeout);
        self
    }

    /// Sets the host compile command. `{sources}` and `{classes}` are
    /// substituted with the bindings and classes directories.
    ///
    /// Default: None (generated sources are packaged as-is)
    pub fn compile_command(mut self, command: Vec<String>) -> Self {
        self.compile_command = Some(command);
        self
    }

    /// Sets native binary sources.
    ///
    /// Default: Empty (nothing staged by this run)
    pub fn natives(mut self, natives: Vec<NativeSource>) -> Self {
        self.natives = natives;
        self
    }

    /// Sets relocation rules and components.
    pub fn relocation(mut self, relocation: RelocationSettings) -> Self {
        self.relocation = relocation;
        self
    }

    /// Sets the native staging directory.
    ///
    /// Default: `<output_directory>/natives`
    pub fn staging_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.staging_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the compiled-classes directory.
    ///
    /// Default: `<output_directory>/classes`
    pub fn classes_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.classes_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the output directory.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn output_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the policy for hosts outside the platform table.
    ///
    /// Default: [`PlatformPolicy::Lenient`]
    pub fn platform_policy(mut self, policy: PlatformPolicy) -> Self {
        self.platform_policy = policy;
        self
    }

    /// Sets platforms that must have a staged binary before packaging.
    ///
    /// Default: the build host's class
    pub fn required_platforms(mut self, platforms: Vec<PlatformClass>) -> Self {
        self.required_platforms = Some(platforms);
        self
    }

    /// Overrides the OS identifier fed to the platform probe.
    ///
    /// Default: `std::env::consts::OS`
    pub fn host_os(mut self, os: impl Into<String>) -> Self {
        self.host_os = Some(os.into());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing:
    /// - `package_settings`
    /// - `output_directory`
    ///
    /// or if the package name, language or library name is empty.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        let package = self
            .package_settings
            .context("package_settings is required")?;
        let output_directory = self
            .output_directory
            .context("output_directory is required")?;

        if package.name.is_empty() {
            crate::bail!("package name must not be empty");
        }
        if package.language.is_empty() {
            crate::bail!("binding language must not be empty");
        }

        let mut generator = self.generator;
        if generator.library.is_empty() {
            generator.library = package.name.clone();
        }

        let staging_directory = self
            .staging_directory
            .unwrap_or_else(|| output_directory.join("natives"));
        let classes_directory = self
            .classes_directory
            .unwrap_or_else(|| output_directory.join("classes"));
        let host_os = self
            .host_os
            .unwrap_or_else(|| crate::bundler::platform::host_os().to_string());

        Ok(Settings::new(
            package,
            generator,
            self.compile_command,
            self.natives,
            self.relocation,
            staging_directory,
            classes_directory,
            output_directory,
            self.platform_policy,
            self.required_platforms,
            host_os,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> PackageSettings {
        PackageSettings {
            name: "einvoice".into(),
            manifest_path: "Cargo.toml".into(),
            language: "kotlin".into(),
        }
    }

    #[test]
    fn defaults_derive_from_output_directory() {
        let settings = SettingsBuilder::new()
            .package_settings(package())
            .output_directory("build")
            .build()
            .unwrap();

        assert_eq!(settings.staging_directory(), Path::new("build/natives"));
        assert_eq!(settings.staging_directory_for("1.2.3"), Path::new("build/natives/1.2.3"));
        assert_eq!(settings.classes_directory(), Path::new("build/classes"));
        assert_eq!(settings.generator().library, "einvoice");
        assert_eq!(settings.archive_path("1.2.3"), Path::new("build/einvoice-1.2.3.jar"));
    }

    #[test]
    fn missing_output_directory_is_rejected() {
        let err = SettingsBuilder::new()
            .package_settings(package())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("output_directory"));
    }
}
