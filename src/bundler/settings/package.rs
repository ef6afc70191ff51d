//! Package identity and binding target.

use std::path::PathBuf;

/// What is being packaged.
///
/// # Examples
///
/// ```no_run
/// use ffi_bundler::bundler::settings::PackageSettings;
///
/// let settings = PackageSettings {
///     name: "einvoice".into(),
///     manifest_path: "../../Cargo.toml".into(),
///     language: "kotlin".into(),
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageSettings {
    /// Artifact name; the archive is written as `<name>-<version>.jar`.
    pub name: String,

    /// Native project manifest holding the authoritative `version` line.
    pub manifest_path: PathBuf,

    /// Target language identifier handed to the generator (e.g. "kotlin").
    pub language: String,
}
