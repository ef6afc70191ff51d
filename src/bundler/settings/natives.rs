//! Native binary sources feeding the artifact assembler.

use crate::bundler::PlatformClass;
use serde::Deserialize;
use std::path::PathBuf;

/// One platform-specific source of native binaries.
///
/// `location` is either a directory (typically a `target/release` tree) or a
/// `.tar.gz` previously exported by `ffi_bundler assemble --export`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NativeSource {
    /// Platform class the binaries are staged under.
    pub platform: PlatformClass,
    /// Directory or archive to collect from.
    #[serde(alias = "dir")]
    pub location: PathBuf,
}

impl NativeSource {
    /// Creates a source for `platform` at `location`.
    pub fn new(platform: PlatformClass, location: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            location: location.into(),
        }
    }

    /// Whether `location` names a gzip-compressed tarball.
    pub fn is_archive(&self) -> bool {
        let name = self.location.to_string_lossy();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }
}
