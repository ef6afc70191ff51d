//! Binding generator invocation settings.

use std::path::PathBuf;
use std::time::Duration;

/// Where the generator and the native library live, and where bindings go.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Generator executable name or path.
    ///
    /// A bare name is looked up next to the release build first, then on `PATH`.
    pub program: PathBuf,

    /// Release build directory of the native library. Also the generator's
    /// working directory.
    pub release_dir: PathBuf,

    /// Library name without `lib` prefix or extension (e.g. "einvoice").
    pub library: String,

    /// Directory receiving generated sources. Wiped before every run.
    pub out_dir: PathBuf,

    /// Optional wall-clock limit for one generator run.
    ///
    /// Default: None (wait indefinitely)
    pub timeout: Option<Duration>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("uniffi-bindgen"),
            release_dir: PathBuf::from("target/release"),
            library: String::new(),
            out_dir: PathBuf::from("build/generated/sources/native"),
            timeout: None,
        }
    }
}
