//! Error types for the binding-and-packaging pipeline.
//!
//! Fatal failures are modelled as [`Error`] variants. Anomalies that the
//! pipeline survives (collisions, unmatched relocation rules, fallback platform
//! classification) are [`crate::bundler::Warning`]s instead and never abort.

use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

/// Result alias used throughout the bundler.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors.
#[derive(ThisError, Debug)]
pub enum Error {
    /// The manifest has no `version = ...` line.
    #[error("no version declaration found in manifest {}", .path.display())]
    ManifestVersionMissing {
        /// Manifest that was scanned
        path: PathBuf,
    },

    /// The binding generator exited non-zero or could not be run.
    #[error(
        "binding generator `{program}` failed (exit code: {})\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}",
        .code.map_or_else(|| "none".to_string(), |c| c.to_string())
    )]
    GenerationFailed {
        /// Generator program
        program: String,
        /// Exit code, `None` if killed by a signal or never started
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The binding generator executable could not be located.
    #[error("binding generator `{program}` not found in {} or on PATH", .searched.display())]
    GeneratorNotFound {
        /// Program name as configured
        program: String,
        /// Directory searched before PATH
        searched: PathBuf,
    },

    /// The binding generator exceeded the configured timeout.
    #[error("binding generator `{program}` did not finish within {secs}s")]
    GeneratorTimedOut {
        /// Generator program
        program: String,
        /// Configured timeout
        secs: u64,
    },

    /// The host-language compile command failed.
    #[error("compile command `{command}` failed (exit code: {code:?})\n{stderr}")]
    CompileFailed {
        /// Rendered command line
        command: String,
        /// Exit code
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Host OS is outside the platform table and the strict policy is active.
    #[error("unsupported build host `{os}`: no platform class matches")]
    PlatformUnsupported {
        /// OS identifier that was probed
        os: String,
    },

    /// A required platform has no staged native binary.
    #[error("no native binary staged for required platform {platform}")]
    MissingPlatformArtifact {
        /// Platform identifier
        platform: String,
    },

    /// The staged host binary is not the library the bindings came from.
    #[error(
        "staged {platform} binary (sha256 {staged}) differs from the library bindings were generated from (sha256 {built})"
    )]
    StaleNativeArtifact {
        /// Platform identifier
        platform: String,
        /// Digest of the staged binary
        staged: String,
        /// Digest of the library handed to the generator
        built: String,
    },

    /// The native library for the build host was not found.
    #[error("native library not found at {}", .path.display())]
    NativeLibraryMissing {
        /// Expected path
        path: PathBuf,
    },

    /// A class file could not be parsed for relocation.
    #[error("invalid class file {entry}: {reason}")]
    InvalidClassFile {
        /// Archive entry or file name
        entry: String,
        /// What was wrong
        reason: String,
    },

    /// A relocation rule is malformed.
    #[error("invalid relocation rule: {0}")]
    InvalidRelocationRule(String),

    /// The driver was asked to perform a non-linear state transition.
    #[error("invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Filesystem operation with context.
    #[error("{context} ({}): {error}", .path.display())]
    Fs {
        /// What was being done
        context: String,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        error: std::io::Error,
    },

    /// Plain I/O error.
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    /// Zip archive error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal error.
    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix error.
    #[error("path error: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Invalid glob pattern.
    #[error("pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

/// Adds filesystem context to I/O results.
pub trait ErrorExt<T> {
    /// Wraps the error with a description of the operation and the path.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Converts options and foreign errors into [`Error::GenericError`].
pub trait Context<T> {
    /// Attaches a message on failure.
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

impl<T> Context<T> for Result<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }
}

/// Returns early with a [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failure_shows_captured_output() {
        let err = Error::GenerationFailed {
            program: "uniffi-bindgen".into(),
            code: Some(2),
            stdout: "scanning".into(),
            stderr: "no such symbol".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code: 2"));
        assert!(msg.contains("scanning"));
        assert!(msg.contains("no such symbol"));
    }

    #[test]
    fn fs_context_keeps_path() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.fs_context("reading manifest", "/x/Cargo.toml").unwrap_err();
        assert!(err.to_string().contains("reading manifest (/x/Cargo.toml)"));
    }
}
