//! Binding-and-packaging pipeline for native libraries.
//!
//! This library turns a compiled native library into a single distributable
//! archive for a host ecosystem:
//! - generated host-language bindings, compiled
//! - one native binary per supported platform class
//! - bundled runtime dependencies relocated under a private namespace
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
