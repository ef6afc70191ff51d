//! Error types for the command line tool.
//!
//! Pipeline failures are [`crate::bundler::Error`]s; this module wraps them
//! together with CLI and configuration errors and attaches hints for the
//! operator.

use crate::bundler::Error as PipelineError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for all CLI operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline errors
    #[error("{0}")]
    Bundler(#[from] PipelineError),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl BundlerError {
    /// Actionable hints for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        let Self::Bundler(error) = self else {
            return vec!["Run with --help for usage".to_string()];
        };
        match error {
            PipelineError::ManifestVersionMissing { .. } => {
                vec!["Add a `version = \"x.y.z\"` line to the native manifest".to_string()]
            }
            PipelineError::GeneratorNotFound { .. } => vec![
                "Build the generator alongside the library (cargo build --release)".to_string(),
                "Or set generator.program in bundle.toml".to_string(),
            ],
            PipelineError::NativeLibraryMissing { .. } => {
                vec!["Build the native library in release mode first".to_string()]
            }
            PipelineError::PlatformUnsupported { .. } => {
                vec!["Drop --strict-platform to fall back to the default platform class".to_string()]
            }
            PipelineError::MissingPlatformArtifact { .. } => vec![
                "Stage the missing platform with `ffi_bundler assemble --from PLATFORM=PATH`".to_string(),
                "Or narrow output.required_platforms".to_string(),
            ],
            PipelineError::StaleNativeArtifact { .. } => vec![
                "Remove the staged binaries for this version and package again".to_string(),
            ],
            PipelineError::GeneratorTimedOut { .. } => {
                vec!["Raise generator.timeout_secs or --generator-timeout".to_string()]
            }
            _ => Vec::new(),
        }
    }
}
