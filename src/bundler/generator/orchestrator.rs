//! Exactly-once binding generation for a pipeline run.

use super::{BindingGenerator, GeneratedBindingSet, GenerationRequest};
use crate::bundler::{
    Error, PlatformClass, Result, Settings,
    builder::checksum::calculate_sha256,
    utils::fs::{create_dir_all, list_files},
};
use path_absolutize::Absolutize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Runs the binding generator once and hands the result to every dependant.
///
/// The output directory is wiped before the run, so bindings from an earlier
/// invocation can never leak into this one.
pub struct GenerationOrchestrator {
    generator: Arc<dyn BindingGenerator>,
    request: GenerationRequest,
    bindings: OnceCell<GeneratedBindingSet>,
}

impl GenerationOrchestrator {
    /// Creates an orchestrator for an explicit request.
    pub fn new(generator: Arc<dyn BindingGenerator>, request: GenerationRequest) -> Self {
        Self {
            generator,
            request,
            bindings: OnceCell::new(),
        }
    }

    /// Derives the request from settings: the host's `lib<name>.<ext>` inside
    /// the release directory, the configured language and output directory.
    pub fn for_settings(
        generator: Arc<dyn BindingGenerator>,
        settings: &Settings,
        host: PlatformClass,
    ) -> Result<Self> {
        let gen_settings = settings.generator();
        let library = gen_settings
            .release_dir
            .join(host.library_file_name(&gen_settings.library));

        let request = GenerationRequest {
            library: library.absolutize()?.into_owned(),
            language: settings.language().to_string(),
            out_dir: gen_settings.out_dir.absolutize()?.into_owned(),
        };
        Ok(Self::new(generator, request))
    }

    /// The request this orchestrator runs.
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    /// Bindings from a completed run, if any.
    pub fn get(&self) -> Option<&GeneratedBindingSet> {
        self.bindings.get()
    }

    /// Returns the bindings, running the generator on first call.
    ///
    /// Concurrent callers wait for the same run. A failed run is not cached;
    /// the pipeline driver stops at the first failure.
    pub async fn bindings(&self) -> Result<&GeneratedBindingSet> {
        self.bindings.get_or_try_init(|| self.run()).await
    }

    async fn run(&self) -> Result<GeneratedBindingSet> {
        let request = &self.request;

        if !tokio::fs::try_exists(&request.library).await.unwrap_or(false) {
            return Err(Error::NativeLibraryMissing {
                path: request.library.clone(),
            });
        }
        let library_sha256 = calculate_sha256(&request.library).await?;

        create_dir_all(&request.out_dir, true).await?;

        log::info!(
            "Generating {} bindings from {} with {}",
            request.language,
            request.library.display(),
            self.generator.name()
        );
        let generator_version = self.generator.version().await;
        self.generator.generate(request).await?;

        let files = list_files(&request.out_dir).await?;
        log::info!(
            "✓ Generated {} binding file(s) into {}",
            files.len(),
            request.out_dir.display()
        );

        Ok(GeneratedBindingSet {
            out_dir: request.out_dir.clone(),
            generator_version,
            library: request.library.clone(),
            library_sha256,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::generator::testing::FakeGenerator;
    use std::path::Path;

    fn request(dir: &Path) -> GenerationRequest {
        std::fs::write(dir.join("libeinvoice.so"), b"\x7fELF native").unwrap();
        GenerationRequest {
            library: dir.join("libeinvoice.so"),
            language: "kotlin".into(),
            out_dir: dir.join("generated"),
        }
    }

    #[tokio::test]
    async fn generator_runs_once_per_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeGenerator::default());
        let orchestrator = GenerationOrchestrator::new(fake.clone(), request(dir.path()));

        let (a, b) = tokio::join!(orchestrator.bindings(), orchestrator.bindings());
        assert_eq!(a.unwrap().files, b.unwrap().files);
        orchestrator.bindings().await.unwrap();

        assert_eq!(fake.calls(), 1);
        let set = orchestrator.get().unwrap();
        assert_eq!(set.files, [Path::new("uniffi/einvoice/einvoice.kt")]);
        assert_eq!(set.generator_version.as_deref(), Some("fake-bindgen 0.1.0"));
        assert_eq!(set.library_sha256.len(), 64);
    }

    #[tokio::test]
    async fn stale_output_is_wiped() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path());
        std::fs::create_dir_all(&req.out_dir).unwrap();
        std::fs::write(req.out_dir.join("Stale.kt"), b"old").unwrap();

        let orchestrator = GenerationOrchestrator::new(Arc::new(FakeGenerator::default()), req);
        let set = orchestrator.bindings().await.unwrap();
        assert!(!set.files.iter().any(|f| f.ends_with("Stale.kt")));
    }

    #[tokio::test]
    async fn missing_library_fails_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeGenerator::default());
        let orchestrator = GenerationOrchestrator::new(
            fake.clone(),
            GenerationRequest {
                library: dir.path().join("libmissing.so"),
                language: "kotlin".into(),
                out_dir: dir.path().join("generated"),
            },
        );

        let err = orchestrator.bindings().await.unwrap_err();
        assert!(matches!(err, Error::NativeLibraryMissing { .. }));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn generator_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator =
            GenerationOrchestrator::new(Arc::new(FakeGenerator::failing()), request(dir.path()));

        let err = orchestrator.bindings().await.unwrap_err();
        assert!(err.to_string().contains("no uniffi metadata found"));
        assert!(orchestrator.get().is_none());
    }
}
