//! Pipeline orchestration.
//!
//! This module provides the [`PackageDriver`] that runs every stage of the
//! binding-and-packaging pipeline in order.
//!
//! # Overview
//!
//! The driver:
//! 1. Resolves the version from the native manifest
//! 2. Generates bindings exactly once
//! 3. Compiles them into host code
//! 4. Stages one native binary per platform class
//! 5. Relocates bundled components and merges service files
//! 6. Writes the archive and its JSON report
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 digests for binaries and archives
//! - [`driver`] - the [`PackageDriver`] state machine
//! - [`tool_detection`] - locating the binding generator

pub mod checksum;
mod driver;
pub mod tool_detection;

pub use driver::{PackageDriver, PackagedArtifact, PipelineState};
