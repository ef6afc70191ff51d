//! File system utilities for bundling.
//!
//! Provides idempotent directory handling, no-clobber staging writes and
//! directory-to-entry-map reads.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    collections::BTreeMap,
    io::{self},
    path::{Path, PathBuf},
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Whether `name` is a scratch file left by [`write_new`].
pub fn is_partial_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".partial")
}

/// Writes `contents` to `dest` unless `dest` already exists.
///
/// The bytes are first written to a scratch file next to `dest`, then hard
/// linked into place. Linking fails when `dest` exists, so a concurrent
/// writer can neither overwrite a staged file nor observe a partial one.
///
/// Returns `false` if `dest` was already present.
pub async fn write_new(dest: &Path, contents: &[u8]) -> Result<bool> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::GenericError(format!("{} has no parent directory", dest.display())))?;
    fs::create_dir_all(parent)
        .await
        .fs_context("creating staging directory", parent)?;

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let scratch = parent.join(format!(".{}.{}.partial", file_name, uuid::Uuid::new_v4()));

    fs::write(&scratch, contents)
        .await
        .fs_context("writing staging scratch file", &scratch)?;

    let linked = match fs::hard_link(&scratch, dest).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => {
            // Filesystems without hard links still get no-clobber semantics
            log::debug!(
                "hard link into {} failed ({}), falling back to exclusive create",
                dest.display(),
                e
            );
            write_exclusive(dest, contents).await
        }
    };

    if let Err(e) = fs::remove_file(&scratch).await {
        log::warn!("Failed to remove scratch file {}: {}", scratch.display(), e);
    }

    linked
}

async fn write_exclusive(dest: &Path, contents: &[u8]) -> Result<bool> {
    use tokio::io::AsyncWriteExt;

    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await;
    let mut file = match file {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e).fs_context("creating staged file", dest),
    };
    file.write_all(contents)
        .await
        .fs_context("writing staged file", dest)?;
    file.sync_all().await.fs_context("syncing staged file", dest)?;
    Ok(true)
}

/// Reads every regular file below `root` into a map keyed by its
/// `/`-separated relative path.
///
/// A missing `root` yields an empty map.
pub async fn read_tree(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    if !fs::try_exists(root).await.unwrap_or(false) {
        return Ok(BTreeMap::new());
    }

    let root = root.to_path_buf();

    // Offload blocking work to dedicated thread pool
    tokio::task::spawn_blocking(move || {
        let mut entries = BTreeMap::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel_path = entry.path().strip_prefix(&root)?;
            let name = rel_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = std::fs::read(entry.path()).fs_context("reading file", entry.path())?;
            entries.insert(name, bytes);
        }
        Ok::<_, Error>(entries)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory read task panicked: {}", e)))?
}

/// Lists regular files below `root` as sorted relative paths.
pub async fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.path().strip_prefix(&root)?.to_path_buf());
            }
        }
        Ok::<_, Error>(files)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory listing task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_new_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("linux-x86-64").join("libx.so");

        assert!(write_new(&dest, b"first").await.unwrap());
        assert!(!write_new(&dest, b"second").await.unwrap());
        assert_eq!(std::fs::read(&dest).unwrap(), b"first");

        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_partial_file(&e.file_name().to_string_lossy()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn read_tree_uses_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("com/example")).unwrap();
        std::fs::write(dir.path().join("com/example/A.class"), b"a").unwrap();

        let tree = read_tree(dir.path()).await.unwrap();
        assert_eq!(tree.keys().collect::<Vec<_>>(), ["com/example/A.class"]);
        assert!(read_tree(&dir.path().join("missing")).await.unwrap().is_empty());
    }
}
