//! External tool detection.
//!
//! The binding generator is usually installed next to the native library's
//! release build (`cargo build --release` produces both), so that directory is
//! searched before `PATH`.

use crate::bundler::{Error, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};

/// Locates `program`, preferring `search_dir` over `PATH`.
///
/// A program given as a path (more than one component) is used as-is.
pub fn locate_tool(program: &Path, search_dir: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        return Ok(program.absolutize()?.into_owned());
    }

    let candidates = [
        search_dir.join(program),
        search_dir.join(format!("{}{}", program.display(), std::env::consts::EXE_SUFFIX)),
    ];
    if let Some(found) = candidates.into_iter().find(|c| c.is_file()) {
        log::debug!("Found {} at: {}", program.display(), found.display());
        return Ok(found.absolutize()?.into_owned());
    }

    match which::which(program) {
        Ok(path) => {
            log::debug!("Found {} on PATH at: {}", program.display(), path.display());
            Ok(path)
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", program.display(), e);
            Err(Error::GeneratorNotFound {
                program: program.display().to_string(),
                searched: search_dir.to_path_buf(),
            })
        }
    }
}
