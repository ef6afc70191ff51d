//! Staged-natives tarballs for handing a platform's binaries between CI jobs.
//!
//! Exports are deterministic: entries are sorted and carry fixed ownership and
//! timestamps, so the same staged tree always produces the same bytes.

use crate::bundler::{Error, Result, error::ErrorExt, utils::fs::is_partial_file};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// Writes every file below `root` into a `.tar.gz` at `dest`.
///
/// The archive is written beside `dest` and renamed into place.
pub async fn export_tree(root: &Path, dest: &Path) -> Result<()> {
    let root = root.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || write_tarball(&root, &dest))
        .await
        .map_err(|e| Error::GenericError(format!("Archive export task panicked: {}", e)))?
}

fn write_tarball(root: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).fs_context("creating export directory", parent)?;
    }
    let partial = partial_path(dest);
    let file = std::fs::File::create(&partial).fs_context("creating export archive", &partial)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for entry in walkdir::WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if !entry.file_type().is_file() || is_partial_file(&name) {
            continue;
        }
        let rel_path = entry.path().strip_prefix(root)?;
        let contents = std::fs::read(entry.path()).fs_context("reading staged file", entry.path())?;

        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, rel_path, contents.as_slice())
            .fs_context("appending to export archive", entry.path())?;
    }

    let encoder = builder.into_inner().fs_context("finishing export archive", &partial)?;
    encoder.finish().fs_context("compressing export archive", &partial)?;
    std::fs::rename(&partial, dest).fs_context("moving export archive into place", dest)?;
    Ok(())
}

/// Unpacks a `.tar.gz` into a fresh temporary directory.
///
/// The directory is removed when the returned handle is dropped.
pub async fn unpack(archive: &Path) -> Result<TempDir> {
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_blocking(&archive))
        .await
        .map_err(|e| Error::GenericError(format!("Archive unpack task panicked: {}", e)))?
}

fn unpack_blocking(archive_path: &Path) -> Result<TempDir> {
    let dir = tempfile::Builder::new()
        .prefix("ffi-bundler-natives-")
        .tempdir()
        .fs_context("creating extraction directory", std::env::temp_dir())?;

    let file = std::fs::File::open(archive_path).fs_context("opening natives archive", archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    for entry in archive.entries().fs_context("reading natives archive", archive_path)? {
        let mut entry = entry.fs_context("reading natives archive entry", archive_path)?;
        let entry_path = entry
            .path()
            .fs_context("reading natives archive entry path", archive_path)?
            .into_owned();
        validate_entry_path(&entry_path)?;

        let dest = dir.path().join(&entry_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).fs_context("creating extraction directory", parent)?;
        }
        entry
            .unpack(&dest)
            .fs_context("extracting natives archive entry", &dest)?;
    }

    Ok(dir)
}

/// Rejects entries that would escape the extraction directory.
fn validate_entry_path(path: &Path) -> Result<()> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(Error::GenericError(format!(
            "natives archive entry escapes extraction directory: {}",
            path.display()
        )));
    }
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_tree(root: &Path) {
        std::fs::create_dir_all(root.join("linux-x86-64")).unwrap();
        std::fs::write(root.join("linux-x86-64/libeinvoice.so"), b"\x7fELF").unwrap();
        std::fs::write(root.join("linux-x86-64/.libeinvoice.so.1234.partial"), b"x").unwrap();
    }

    #[tokio::test]
    async fn export_is_deterministic_and_unpacks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("natives");
        staged_tree(&root);

        let first = dir.path().join("a/natives.tar.gz");
        let second = dir.path().join("b/natives.tar.gz");
        export_tree(&root, &first).await.unwrap();
        export_tree(&root, &second).await.unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());

        let unpacked = unpack(&first).await.unwrap();
        assert_eq!(
            std::fs::read(unpacked.path().join("linux-x86-64/libeinvoice.so")).unwrap(),
            b"\x7fELF"
        );
        assert!(!unpacked.path().join("linux-x86-64/.libeinvoice.so.1234.partial").exists());
    }

    #[test]
    fn traversal_entries_are_rejected() {
        assert!(validate_entry_path(Path::new("../evil.so")).is_err());
        assert!(validate_entry_path(Path::new("/etc/evil.so")).is_err());
        assert!(validate_entry_path(Path::new("linux-x86-64/lib.so")).is_ok());
    }
}
