//! Binding-and-packaging pipeline.
//!
//! Packages a compiled native library together with generated host-language
//! bindings into one multi-platform archive.
//!
//! # Module Organization
//!
//! - [`platform`] - build-host classification and native naming conventions
//! - [`generator`] - binding generator capability and its orchestration
//! - [`compile`] - host-language compile stage
//! - [`assembler`] - per-platform native binary staging with first-write-wins merges
//! - [`relocate`] - namespace relocation and service file merging
//! - [`package`] - deterministic archive writing
//! - [`builder`] - the [`PackageDriver`] state machine that sequences all stages
//! - [`settings`] - configuration consumed by the stages

pub mod assembler;
pub mod builder;
pub mod compile;
pub mod error;
pub mod generator;
pub mod package;
pub mod platform;
pub mod relocate;
pub mod settings;
pub mod utils;

pub use builder::{PackageDriver, PackagedArtifact, PipelineState};
pub use error::{Error, Result};
pub use platform::{PlatformClass, PlatformPolicy};
pub use settings::{Settings, SettingsBuilder};

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Non-fatal anomaly surfaced to the release operator.
///
/// Every warning is logged when raised and collected into the
/// [`PackagedArtifact`] so the CLI can summarize them at the end of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Host OS was not in the platform table; a fallback class was used.
    PlatformUnrecognized {
        /// Probed identifier
        os: String,
        /// Class used instead
        fallback: PlatformClass,
    },
    /// A staged file already existed; the incoming copy was excluded.
    DuplicateArtifactCollision {
        /// Destination path relative to the staging root
        path: PathBuf,
        /// SHA-256 of the file that was kept
        kept_sha256: String,
        /// SHA-256 of the file that was dropped
        excluded_sha256: String,
    },
    /// More than one candidate binary for a platform; only one is packaged.
    ExtraNativeArtifactIgnored {
        /// Platform class
        platform: PlatformClass,
        /// Ignored file
        path: PathBuf,
    },
    /// A binary's object format disagrees with its platform class.
    NativeArchitectureMismatch {
        /// Platform class it was offered for
        platform: PlatformClass,
        /// Offending file
        path: PathBuf,
        /// What goblin found
        found: String,
    },
    /// A platform that is not required has no staged binary.
    OptionalPlatformMissing {
        /// Platform class
        platform: PlatformClass,
    },
    /// A relocation rule matched nothing in any input.
    RelocationRuleUnmatched {
        /// Original prefix of the rule
        from: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformUnrecognized { os, fallback } => write!(
                f,
                "platform unrecognized: host `{os}` is not in the platform table, falling back to {fallback}"
            ),
            Self::DuplicateArtifactCollision {
                path,
                kept_sha256,
                excluded_sha256,
            } => write!(
                f,
                "duplicate artifact collision: {} kept (sha256 {}), incoming copy excluded (sha256 {})",
                path.display(),
                kept_sha256,
                excluded_sha256
            ),
            Self::ExtraNativeArtifactIgnored { platform, path } => write!(
                f,
                "extra native artifact for {platform} ignored: {}",
                path.display()
            ),
            Self::NativeArchitectureMismatch {
                platform,
                path,
                found,
            } => write!(
                f,
                "native artifact {} offered for {platform} is a {found}; excluded",
                path.display()
            ),
            Self::OptionalPlatformMissing { platform } => {
                write!(f, "no native binary staged for {platform}; package will not support it")
            }
            Self::RelocationRuleUnmatched { from } => write!(
                f,
                "relocation rule `{from}` matched nothing in the bundled components (dependency version drift?)"
            ),
        }
    }
}
