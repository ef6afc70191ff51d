//! Namespace relocation settings.

use crate::bundler::relocate::RelocationRule;
use std::path::PathBuf;

/// Rules and the third-party components they apply to.
#[derive(Debug, Clone, Default)]
pub struct RelocationSettings {
    /// Prefix rewrites, e.g. `kotlinx.coroutines` → `com.example.coroutines`.
    pub rules: Vec<RelocationRule>,

    /// Jars bundled into the package (coroutine runtime, annotation libraries,
    /// the host language's runtime support library).
    pub components: Vec<PathBuf>,
}
