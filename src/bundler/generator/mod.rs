//! Binding generation.
//!
//! The binding generator is an external program that reads a compiled native
//! library and writes host-language sources. It is reached through the
//! [`BindingGenerator`] trait so the pipeline can be exercised with a fake;
//! [`CommandGenerator`] is the real implementation and
//! [`GenerationOrchestrator`] makes sure it runs exactly once per pipeline run.

mod command;
mod orchestrator;

pub use command::{CommandGenerator, LineSink};
pub use orchestrator::GenerationOrchestrator;

use crate::bundler::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

/// Inputs of one generator run. Paths are absolute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Compiled native library for the build host
    pub library: PathBuf,
    /// Target language (e.g. "kotlin")
    pub language: String,
    /// Directory receiving generated sources
    pub out_dir: PathBuf,
}

/// Output tree of one successful generator run.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedBindingSet {
    /// Directory holding the generated sources
    pub out_dir: PathBuf,
    /// Generator version, if the generator reports one
    pub generator_version: Option<String>,
    /// Native library the bindings were generated from
    pub library: PathBuf,
    /// SHA-256 of that library at generation time
    pub library_sha256: String,
    /// Generated files relative to `out_dir`, sorted
    pub files: Vec<PathBuf>,
}

/// Capability to turn a compiled native library into host-language sources.
#[async_trait]
pub trait BindingGenerator: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Best-effort version string of the generator.
    async fn version(&self) -> Option<String> {
        None
    }

    /// Writes bindings for `request.library` into `request.out_dir`.
    ///
    /// `out_dir` exists and is empty when this is called.
    async fn generate(&self, request: &GenerationRequest) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::bundler::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic stand-in for the external generator.
    ///
    /// Writes one source file whose content is derived from the library
    /// bytes, or fails like a generator exiting with code 1.
    #[derive(Default)]
    pub(crate) struct FakeGenerator {
        pub(crate) fail: bool,
        pub(crate) calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BindingGenerator for FakeGenerator {
        fn name(&self) -> &str {
            "fake-bindgen"
        }

        async fn version(&self) -> Option<String> {
            Some("fake-bindgen 0.1.0".into())
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::GenerationFailed {
                    program: self.name().into(),
                    code: Some(1),
                    stdout: "scanning library".into(),
                    stderr: "error: no uniffi metadata found".into(),
                });
            }

            let library = std::fs::read(&request.library)?;
            let dir = request.out_dir.join("uniffi").join("einvoice");
            std::fs::create_dir_all(&dir)?;
            std::fs::write(
                dir.join("einvoice.kt"),
                format!(
                    "package uniffi.einvoice\n// {} bindings for {} library bytes\n",
                    request.language,
                    library.len()
                ),
            )?;
            Ok(())
        }
    }
}
