//! The pipeline state machine.

use crate::bundler::{
    Error, PlatformClass, Result, Settings, Warning,
    assembler::{ArtifactAssembler, StagedNative, check_platforms},
    compile::{HostCompiler, compiler_for},
    error::ErrorExt,
    generator::{BindingGenerator, GenerationOrchestrator},
    package::{PackageReport, manifest, write_package, write_report},
    platform,
    relocate::{InputKind, NamespaceRelocator},
    utils::fs::{create_dir_all, read_tree},
};
use crate::metadata::resolve_version;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a pipeline run stands. Transitions are strictly linear; any stage
/// failure moves to [`Failed`](PipelineState::Failed), which is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet
    Init,
    /// The manifest version is known
    VersionResolved,
    /// Bindings were generated
    BindingsGenerated,
    /// Bindings were compiled into host code
    Compiled,
    /// Native binaries are staged for every required platform
    Assembled,
    /// Host code and components are relocated and merged
    Relocated,
    /// The archive exists at its final path
    Packaged,
    /// A stage failed
    Failed,
}

impl PipelineState {
    /// The only state reachable from `self` on success.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::VersionResolved),
            Self::VersionResolved => Some(Self::BindingsGenerated),
            Self::BindingsGenerated => Some(Self::Compiled),
            Self::Compiled => Some(Self::Assembled),
            Self::Assembled => Some(Self::Relocated),
            Self::Relocated => Some(Self::Packaged),
            Self::Packaged | Self::Failed => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A finished package.
#[derive(Clone, Debug)]
pub struct PackagedArtifact {
    /// Final archive path
    pub archive_path: PathBuf,
    /// JSON report path
    pub report_path: PathBuf,
    /// Version from the native manifest
    pub version: String,
    /// SHA-256 of the archive
    pub sha256: String,
    /// Archive size in bytes
    pub size: u64,
    /// Packaged native binaries
    pub platforms: Vec<StagedNative>,
    /// Every warning raised during the run
    pub warnings: Vec<Warning>,
}

/// Sequences version resolution, generation, compilation, assembly,
/// relocation and packaging.
///
/// # Examples
///
/// ```no_run
/// use ffi_bundler::bundler::{PackageDriver, generator::CommandGenerator};
/// use std::sync::Arc;
///
/// # async fn example(settings: ffi_bundler::bundler::Settings) -> ffi_bundler::bundler::Result<()> {
/// let generator = Arc::new(CommandGenerator::new(settings.generator()));
/// let mut driver = PackageDriver::new(settings, generator)?;
/// let artifact = driver.run().await?;
/// println!("{} ({})", artifact.archive_path.display(), artifact.sha256);
/// # Ok(())
/// # }
/// ```
pub struct PackageDriver {
    settings: Settings,
    generator: Arc<dyn BindingGenerator>,
    compiler: Arc<dyn HostCompiler>,
    state: PipelineState,
    warnings: Vec<Warning>,
}

impl fmt::Debug for PackageDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageDriver")
            .field("settings", &self.settings)
            .field("generator", &self.generator.name())
            .field("compiler", &self.compiler.name())
            .field("state", &self.state)
            .finish()
    }
}

impl PackageDriver {
    /// Creates a driver using the compiler configured in `settings`.
    pub fn new(settings: Settings, generator: Arc<dyn BindingGenerator>) -> Result<Self> {
        let compiler = compiler_for(&settings)?;
        Ok(Self {
            settings,
            generator,
            compiler,
            state: PipelineState::Init,
            warnings: Vec::new(),
        })
    }

    /// Replaces the host compiler.
    pub fn with_compiler(mut self, compiler: Arc<dyn HostCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Warnings raised so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Settings in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs every stage. On error the driver ends in
    /// [`PipelineState::Failed`] and the failed run has written nothing to
    /// the final archive path; an archive from an earlier successful run of
    /// the same version is left untouched.
    pub async fn run(&mut self) -> Result<PackagedArtifact> {
        if self.state != PipelineState::Init {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: PipelineState::VersionResolved.to_string(),
            });
        }

        match self.run_stages().await {
            Ok(artifact) => Ok(artifact),
            Err(e) => {
                log::error!("Pipeline failed in state {}: {}", self.state, e);
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn advance(&mut self, to: PipelineState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        log::debug!("Pipeline state {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    fn warn_all(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    async fn run_stages(&mut self) -> Result<PackagedArtifact> {
        let settings = self.settings.clone();

        let version = resolve_version(settings.manifest_path())?;
        log::info!("✓ Resolved version {} from {}", version, settings.manifest_path().display());
        self.advance(PipelineState::VersionResolved)?;

        let (host, warning) = platform::resolve(settings.host_os(), settings.platform_policy())?;
        self.warn_all(warning);
        log::info!("Build host classified as {}", host);

        let orchestrator =
            GenerationOrchestrator::for_settings(self.generator.clone(), &settings, host)?;
        let bindings = orchestrator.bindings().await?.clone();
        self.advance(PipelineState::BindingsGenerated)?;

        let classes_dir = settings.classes_directory();
        create_dir_all(classes_dir, true).await?;
        self.compiler.compile(&bindings, classes_dir).await?;
        log::info!("✓ Compiled bindings with {}", self.compiler.name());
        self.advance(PipelineState::Compiled)?;

        let assembler = ArtifactAssembler::for_settings(&settings, &version);
        let assembly = assembler.merge(settings.natives()).await?;
        self.warn_all(assembly.warnings);
        let (staged, extras) = assembler.staged().await?;
        self.warn_all(extras);
        let required: Vec<PlatformClass> = settings
            .required_platforms()
            .map_or_else(|| vec![host], <[PlatformClass]>::to_vec);
        let missing = check_platforms(&staged, &required)?;
        self.warn_all(missing);
        if let Some(native) = staged.get(&host) {
            if native.sha256 != bindings.library_sha256 {
                return Err(Error::StaleNativeArtifact {
                    platform: host.to_string(),
                    staged: native.sha256.clone(),
                    built: bindings.library_sha256.clone(),
                });
            }
        }
        self.advance(PipelineState::Assembled)?;

        let mut relocator = NamespaceRelocator::new(&settings.relocation().rules);
        relocator.add_input("compiled bindings", InputKind::Project, read_tree(classes_dir).await?)?;
        for component in &settings.relocation().components {
            relocator.add_component_jar(component)?;
        }
        let (mut entries, relocation) = relocator.finish();
        self.warn_all(relocation.warnings());
        self.advance(PipelineState::Relocated)?;

        for native in staged.values() {
            let path = assembler.staging_root().join(&native.path);
            let bytes = tokio::fs::read(&path)
                .await
                .fs_context("reading staged binary", &path)?;
            entries.entry(native.entry_name()).or_insert(bytes);
        }

        let archive_path = settings.archive_path(&version);
        let sha256 = write_package(
            &archive_path,
            manifest(settings.package_name(), &version),
            entries,
        )
        .await?;
        let size = tokio::fs::metadata(&archive_path)
            .await
            .map(|m| m.len())
            .unwrap_or_default();

        let platforms: Vec<StagedNative> = staged.into_values().collect();
        let report = PackageReport {
            package: settings.package_name().to_string(),
            version: version.clone(),
            archive: archive_path.clone(),
            sha256: sha256.clone(),
            created_at: chrono::Utc::now(),
            host_platform: host,
            generator_version: bindings.generator_version.clone(),
            library_sha256: bindings.library_sha256.clone(),
            platforms: platforms.clone(),
            relocation,
            warnings: self.warnings.clone(),
        };
        let report_path = match write_report(&report).await {
            Ok(path) => path,
            Err(e) => {
                // An archive without its report is not a finished package
                if let Err(cleanup) = tokio::fs::remove_file(&archive_path).await {
                    log::warn!("Failed to remove {}: {}", archive_path.display(), cleanup);
                }
                return Err(e);
            }
        };
        self.advance(PipelineState::Packaged)?;
        log::info!("✓ Packaged {} ({})", archive_path.display(), sha256);

        Ok(PackagedArtifact {
            archive_path,
            report_path,
            version,
            sha256,
            size,
            platforms,
            warnings: self.warnings.clone(),
        })
    }
}
