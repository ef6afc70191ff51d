//! Per-platform native binary staging.
//!
//! Every release-matrix job contributes the native binary built on its host.
//! The [`ArtifactAssembler`] collects one binary per platform class from a
//! directory (or an exported tarball) and merges it into a shared staging tree
//! laid out as `<platform-class>/<file>`. What is already staged is never
//! overwritten.
//!
//! # Module Organization
//!
//! - [`plan`] - the pure merge decision
//! - [`archive`] - tarball export and import of the staging tree

pub mod archive;
pub mod plan;

pub use plan::{DestinationState, Exclusion, IncomingFile, MergePlan, plan_merge};

use crate::bundler::{
    PlatformClass, Result, Settings, Warning,
    builder::checksum::sha256_bytes,
    error::ErrorExt,
    platform::{BinaryCheck, check_binary},
    settings::NativeSource,
    utils::fs::{is_partial_file, read_tree, write_new},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A native binary present in the staging tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StagedNative {
    /// Platform class the binary belongs to
    pub platform: PlatformClass,
    /// Path relative to the staging root
    pub path: PathBuf,
    /// SHA-256 of the binary
    pub sha256: String,
    /// Size in bytes
    pub size: u64,
}

impl StagedNative {
    /// Entry name inside the package (`linux-x86-64/libeinvoice.so`).
    pub fn entry_name(&self) -> String {
        self.path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Outcome of one [`ArtifactAssembler::merge`].
#[derive(Clone, Debug, Default)]
pub struct AssemblyReport {
    /// Binaries written by this merge
    pub staged: Vec<StagedNative>,
    /// Offered binaries that lost to an existing copy
    pub exclusions: Vec<Exclusion>,
    /// Everything worth telling the operator, exclusions included
    pub warnings: Vec<Warning>,
}

/// Collects native binaries into a shared staging tree.
#[derive(Clone, Debug)]
pub struct ArtifactAssembler {
    staging_root: PathBuf,
    library: String,
}

impl ArtifactAssembler {
    /// Creates an assembler staging into `staging_root`. `library` is the
    /// native library name without prefix or extension, used to choose between
    /// several candidate binaries.
    pub fn new(staging_root: impl Into<PathBuf>, library: impl Into<String>) -> Self {
        Self {
            staging_root: staging_root.into(),
            library: library.into(),
        }
    }

    /// Creates an assembler staging `version`'s natives as configured in
    /// `settings`.
    pub fn for_settings(settings: &Settings, version: &str) -> Self {
        Self::new(settings.staging_directory_for(version), &settings.generator().library)
    }

    /// Staging root.
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Digests of everything already staged, keyed by relative path.
    pub async fn scan_state(&self) -> Result<DestinationState> {
        let tree = read_tree(&self.staging_root).await?;
        Ok(tree
            .into_iter()
            .filter(|(name, _)| !name.rsplit('/').next().is_some_and(is_partial_file))
            .map(|(name, bytes)| (PathBuf::from(name), sha256_bytes(&bytes)))
            .collect())
    }

    /// Collects the one binary `source` contributes for its platform class.
    ///
    /// Candidates are the files matching the class's native glob. Binaries
    /// whose object format contradicts the class are dropped; among the rest
    /// `lib<library>.<ext>` is preferred, otherwise the first by name.
    pub async fn collect(&self, source: &NativeSource) -> Result<(Option<IncomingFile>, Vec<Warning>)> {
        let platform = source.platform;

        // Keeps an unpacked archive alive until collection is done
        let unpacked = if source.is_archive() {
            Some(archive::unpack(&source.location).await?)
        } else {
            None
        };
        let dir = match &unpacked {
            Some(tmp) => {
                let nested = tmp.path().join(platform.identifier());
                if nested.is_dir() { nested } else { tmp.path().to_path_buf() }
            }
            None => source.location.clone(),
        };

        let mut warnings = Vec::new();
        let mut candidates = Vec::new();
        for path in matching_files(&dir, platform).await? {
            let contents = tokio::fs::read(&path)
                .await
                .fs_context("reading native binary", &path)?;
            match check_binary(&contents, platform) {
                BinaryCheck::Mismatch(found) => {
                    let warning = Warning::NativeArchitectureMismatch {
                        platform,
                        path: path.clone(),
                        found,
                    };
                    log::warn!("{warning}");
                    warnings.push(warning);
                }
                BinaryCheck::Matches | BinaryCheck::Unrecognized => candidates.push((path, contents)),
            }
        }

        if candidates.is_empty() {
            log::debug!("No {} binaries in {}", platform, dir.display());
            return Ok((None, warnings));
        }
        let preferred = platform.library_file_name(&self.library);
        let chosen = candidates
            .iter()
            .position(|(path, _)| path.file_name().is_some_and(|n| n == preferred.as_str()))
            .unwrap_or_default();
        let (origin, contents) = candidates.remove(chosen);

        for (path, _) in candidates {
            let warning = Warning::ExtraNativeArtifactIgnored { platform, path };
            log::warn!("{warning}");
            warnings.push(warning);
        }

        let file_name = origin
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&preferred));
        let incoming = IncomingFile {
            destination: PathBuf::from(platform.identifier()).join(file_name),
            sha256: sha256_bytes(&contents),
            origin: source.location.join(origin.strip_prefix(&dir).unwrap_or(&origin)),
            contents,
        };
        Ok((Some(incoming), warnings))
    }

    /// Collects from every source and merges into the staging tree.
    pub async fn merge(&self, sources: &[NativeSource]) -> Result<AssemblyReport> {
        let mut report = AssemblyReport::default();
        let mut incoming = Vec::new();
        for source in sources {
            let (file, warnings) = self.collect(source).await?;
            report.warnings.extend(warnings);
            incoming.extend(file);
        }

        let existing = self.scan_state().await?;
        let plan = plan_merge(&existing, incoming);

        for file in plan.copies {
            let dest = self.staging_root.join(&file.destination);
            if write_new(&dest, &file.contents).await? {
                log::info!("✓ Staged {}", file.destination.display());
                let platform = platform_of(&file.destination)
                    .unwrap_or(PlatformClass::FALLBACK);
                report.staged.push(StagedNative {
                    platform,
                    path: file.destination,
                    size: file.contents.len() as u64,
                    sha256: file.sha256,
                });
            } else {
                // Another writer staged the same path since the scan
                let kept = tokio::fs::read(&dest)
                    .await
                    .fs_context("reading staged binary", &dest)?;
                report.exclusions.push(Exclusion {
                    destination: file.destination,
                    origin: file.origin,
                    kept_sha256: sha256_bytes(&kept),
                    excluded_sha256: file.sha256,
                });
            }
        }
        report.exclusions.extend(plan.exclusions);

        for exclusion in &report.exclusions {
            if exclusion.kept_sha256 == exclusion.excluded_sha256 {
                log::info!(
                    "{} already staged with identical content",
                    exclusion.destination.display()
                );
                continue;
            }
            let warning = exclusion.warning();
            log::warn!("{warning} (from {})", exclusion.origin.display());
            report.warnings.push(warning);
        }

        Ok(report)
    }

    /// The single staged binary of every platform class present.
    ///
    /// If a class directory holds several binaries (staged under different
    /// names by different jobs), the preferred name wins and the others are
    /// reported.
    pub async fn staged(&self) -> Result<(BTreeMap<PlatformClass, StagedNative>, Vec<Warning>)> {
        let tree = read_tree(&self.staging_root).await?;
        let mut by_platform: BTreeMap<PlatformClass, Vec<StagedNative>> = BTreeMap::new();

        for (name, bytes) in tree {
            let path = PathBuf::from(&name);
            let Some(platform) = platform_of(&path) else {
                log::debug!("Ignoring staged file outside a platform directory: {}", name);
                continue;
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if is_partial_file(&file_name)
                || path.components().count() != 2
                || !glob::Pattern::new(&platform.library_glob())?.matches(&file_name)
            {
                continue;
            }
            by_platform.entry(platform).or_default().push(StagedNative {
                platform,
                path,
                sha256: sha256_bytes(&bytes),
                size: bytes.len() as u64,
            });
        }

        let mut warnings = Vec::new();
        let mut selected = BTreeMap::new();
        for (platform, mut natives) in by_platform {
            let preferred = platform.library_file_name(&self.library);
            let chosen = natives
                .iter()
                .position(|n| n.path.file_name().is_some_and(|f| f == preferred.as_str()))
                .unwrap_or_default();
            selected.insert(platform, natives.remove(chosen));
            for extra in natives {
                let warning = Warning::ExtraNativeArtifactIgnored {
                    platform,
                    path: self.staging_root.join(&extra.path),
                };
                log::warn!("{warning}");
                warnings.push(warning);
            }
        }

        Ok((selected, warnings))
    }
}

/// Checks that every required class has a staged binary.
///
/// Missing required classes fail with
/// [`Error::MissingPlatformArtifact`](crate::bundler::Error::MissingPlatformArtifact);
/// missing optional ones produce [`Warning::OptionalPlatformMissing`].
pub fn check_platforms(
    staged: &BTreeMap<PlatformClass, StagedNative>,
    required: &[PlatformClass],
) -> Result<Vec<Warning>> {
    if let Some(missing) = required.iter().find(|p| !staged.contains_key(p)) {
        return Err(crate::bundler::Error::MissingPlatformArtifact {
            platform: missing.to_string(),
        });
    }

    Ok(PlatformClass::ALL
        .into_iter()
        .filter(|p| !staged.contains_key(p))
        .map(|platform| {
            let warning = Warning::OptionalPlatformMissing { platform };
            log::warn!("{warning}");
            warning
        })
        .collect())
}

fn platform_of(path: &Path) -> Option<PlatformClass> {
    path.components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .and_then(|dir| dir.parse().ok())
}

/// Top-level files of `dir` matching the class's native glob, sorted by name.
async fn matching_files(dir: &Path, platform: PlatformClass) -> Result<Vec<PathBuf>> {
    let pattern = glob::Pattern::new(&platform.library_glob())?;
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .fs_context("reading native source directory", dir)?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading native source directory", dir)?
    {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let is_file = entry
            .file_type()
            .await
            .fs_context("reading file type", entry.path())?
            .is_file();
        if is_file && !is_partial_file(&name) && pattern.matches(&name) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
