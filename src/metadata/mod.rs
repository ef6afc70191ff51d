//! Version resolution from the native manifest and `bundle.toml` loading.

use crate::bundler::{
    Error, PlatformClass, PlatformPolicy, Result, Settings, SettingsBuilder,
    error::ErrorExt,
    relocate::RelocationRule,
    settings::{GeneratorSettings, NativeSource, PackageSettings, RelocationSettings},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keyword that starts the version declaration line.
const VERSION_KEYWORD: &str = "version";

/// Reads `manifest_path` and returns its version string.
///
/// The manifest version is the only version the packaged artifact ever
/// carries.
pub fn resolve_version(manifest_path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(manifest_path)
        .fs_context("reading native manifest", manifest_path)?;

    let version = parse_version(&contents).ok_or_else(|| Error::ManifestVersionMissing {
        path: manifest_path.to_path_buf(),
    })?;

    if semver::Version::parse(&version).is_err() {
        log::warn!(
            "manifest version `{}` in {} is not valid semver; using it verbatim",
            version,
            manifest_path.display()
        );
    }

    Ok(version)
}

/// Returns the value of the first line starting with `version`.
///
/// The line is split on the first `=` and the value is stripped of quotes and
/// surrounding whitespace. A matching line without `=` yields `None`.
pub fn parse_version(contents: &str) -> Option<String> {
    let line = contents
        .lines()
        .find(|line| line.starts_with(VERSION_KEYWORD))?;
    let (_, value) = line.split_once('=')?;
    Some(value.replace('"', "").trim().to_string())
}

/// Name of the configuration file looked up by default.
pub const DEFAULT_CONFIG_FILE: &str = "bundle.toml";

/// `bundle.toml` as written on disk.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleFile {
    package: PackageSection,
    #[serde(default)]
    generator: GeneratorSection,
    #[serde(default)]
    compile: CompileSection,
    #[serde(default)]
    natives: Vec<NativeSource>,
    #[serde(default)]
    relocation: RelocationSection,
    #[serde(default)]
    output: OutputSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageSection {
    name: String,
    manifest: PathBuf,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "kotlin".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneratorSection {
    program: Option<PathBuf>,
    release_dir: Option<PathBuf>,
    library: Option<String>,
    out_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CompileSection {
    command: Option<Vec<String>>,
    classes_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelocationSection {
    #[serde(default)]
    rules: Vec<RuleEntry>,
    #[serde(default)]
    components: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    from: String,
    to: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputSection {
    dir: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    #[serde(default)]
    platform_policy: PlatformPolicy,
    required_platforms: Option<Vec<PlatformClass>>,
}

/// Loads `bundle.toml` into [`Settings`].
///
/// Relative paths resolve against the directory containing the file.
/// When the file has no `[[natives]]` table, both platform classes are
/// collected from the generator's release directory.
pub fn load_settings(config_path: &Path) -> Result<Settings> {
    load_settings_builder(config_path)?.build()
}

/// Loads `bundle.toml` into a [`SettingsBuilder`] so callers can apply
/// overrides (command line flags) before building.
pub fn load_settings_builder(config_path: &Path) -> Result<SettingsBuilder> {
    let raw = std::fs::read_to_string(config_path)
        .fs_context("reading bundle configuration", config_path)?;
    let base = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    builder_from_str(&raw, base)
}

/// Parses `bundle.toml` contents, resolving relative paths against `base`.
pub fn settings_from_str(raw: &str, base: &Path) -> Result<Settings> {
    builder_from_str(raw, base)?.build()
}

fn builder_from_str(raw: &str, base: &Path) -> Result<SettingsBuilder> {
    let file: BundleFile = toml::from_str(raw)
        .map_err(|e| Error::GenericError(format!("invalid bundle configuration: {e}")))?;

    let resolve = |p: &Path| -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base.join(p)
        }
    };

    let defaults = GeneratorSettings::default();
    let release_dir = resolve(
        file.generator
            .release_dir
            .as_deref()
            .unwrap_or(defaults.release_dir.as_path()),
    );
    let program = match file.generator.program {
        // Bare names are resolved by the generator lookup, not here
        Some(p) if p.components().count() > 1 => resolve(p.as_path()),
        Some(p) => p,
        None => defaults.program,
    };
    let generator = GeneratorSettings {
        program,
        release_dir: release_dir.clone(),
        library: file.generator.library.unwrap_or_default(),
        out_dir: resolve(file.generator.out_dir.as_deref().unwrap_or(defaults.out_dir.as_path())),
        timeout: file.generator.timeout_secs.map(Duration::from_secs),
    };

    let natives = if file.natives.is_empty() {
        PlatformClass::ALL
            .into_iter()
            .map(|platform| NativeSource::new(platform, release_dir.clone()))
            .collect()
    } else {
        file.natives
            .into_iter()
            .map(|n| NativeSource::new(n.platform, resolve(n.location.as_path())))
            .collect()
    };

    let rules = file
        .relocation
        .rules
        .into_iter()
        .map(|r| RelocationRule::new(&r.from, &r.to))
        .collect::<Result<Vec<_>>>()?;
    let relocation = RelocationSettings {
        rules,
        components: file.relocation.components.iter().map(|c| resolve(c.as_path())).collect(),
    };

    let output_dir = resolve(file.output.dir.as_deref().unwrap_or(Path::new("build/libs")));

    let mut builder = SettingsBuilder::new()
        .package_settings(PackageSettings {
            name: file.package.name,
            manifest_path: resolve(file.package.manifest.as_path()),
            language: file.package.language,
        })
        .generator(generator)
        .natives(natives)
        .relocation(relocation)
        .output_directory(&output_dir)
        .platform_policy(file.output.platform_policy);

    if let Some(command) = file.compile.command {
        builder = builder.compile_command(command);
    }
    if let Some(dir) = file.compile.classes_dir {
        builder = builder.classes_directory(resolve(dir.as_path()));
    }
    if let Some(dir) = file.output.staging_dir {
        builder = builder.staging_directory(resolve(dir.as_path()));
    }
    if let Some(platforms) = file.output.required_platforms {
        builder = builder.required_platforms(platforms);
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_stripped_of_quotes_and_whitespace() {
        let manifest = "[package]\nname = \"einvoice\"\nversion = \"0.4.1\"\nedition = \"2021\"\n";
        assert_eq!(parse_version(manifest).as_deref(), Some("0.4.1"));
        assert_eq!(parse_version("version=  \" 1.0.0-rc.1 \"  ").as_deref(), Some("1.0.0-rc.1"));
    }

    #[test]
    fn first_version_line_wins() {
        let manifest = "version = \"1.0.0\"\n[dependencies]\nversion = \"9.9.9\"\n";
        assert_eq!(parse_version(manifest).as_deref(), Some("1.0.0"));
    }

    #[test]
    fn indented_version_lines_do_not_count() {
        // Dependency tables written inline or indented are not the package version
        assert_eq!(parse_version("[dependencies.foo]\n  version = \"2\"\n"), None);
    }

    #[test]
    fn missing_version_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cargo.toml");
        std::fs::write(&path, "[package]\nname = \"x\"\n").unwrap();

        let err = resolve_version(&path).unwrap_err();
        assert!(matches!(err, Error::ManifestVersionMissing { .. }));
    }

    #[test]
    fn bundle_file_resolves_relative_paths() {
        let raw = r#"
            [package]
            name = "einvoice"
            manifest = "../../Cargo.toml"

            [generator]
            release_dir = "../../target/release"

            [relocation]
            rules = [
                { from = "kotlinx.coroutines", to = "com.schneppe.einvoice.coroutines" },
                { from = "kotlin", to = "com.schneppe.einvoice.kotlin" },
            ]
            components = ["libs/kotlin-stdlib.jar"]

            [output]
            required_platforms = ["linux-x86-64", "darwin-aarch64"]
        "#;
        let settings = settings_from_str(raw, Path::new("/repo/bindings/kotlin")).unwrap();

        assert_eq!(settings.language(), "kotlin");
        assert_eq!(settings.manifest_path(), Path::new("/repo/bindings/kotlin/../../Cargo.toml"));
        assert_eq!(settings.generator().library, "einvoice");
        assert_eq!(settings.natives().len(), 2);
        assert_eq!(settings.relocation().rules.len(), 2);
        assert_eq!(
            settings.relocation().components,
            vec![PathBuf::from("/repo/bindings/kotlin/libs/kotlin-stdlib.jar")]
        );
        assert_eq!(settings.required_platforms().map(<[_]>::len), Some(2));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = "[package]\nname = \"x\"\nmanifest = \"Cargo.toml\"\nflavour = \"spicy\"\n";
        assert!(settings_from_str(raw, Path::new(".")).is_err());
    }
}
