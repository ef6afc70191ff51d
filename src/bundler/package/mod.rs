//! Final archive writing.
//!
//! The package is a jar: a zip whose first entry is `META-INF/MANIFEST.MF`.
//! Entries are written in sorted order with a fixed timestamp and fixed
//! permissions, so identical inputs always give a byte-identical archive.
//! The archive is written to `<name>.partial` and renamed only when complete.

mod report;

pub use report::{PackageReport, write_report};

use crate::bundler::{
    Error, Result, builder::checksum::calculate_sha256, error::ErrorExt, relocate::Entries,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

/// Manifest entry name.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Builds the jar manifest for `name` at `version`.
pub fn manifest(name: &str, version: &str) -> Vec<u8> {
    format!(
        "Manifest-Version: 1.0\r\n\
         Created-By: ffi_bundler\r\n\
         Implementation-Title: {name}\r\n\
         Implementation-Version: {version}\r\n\
         \r\n"
    )
    .into_bytes()
}

/// Writes `manifest` followed by `entries` to `dest` and returns the archive's
/// SHA-256.
///
/// A leftover `dest` from an earlier run is replaced only after the new
/// archive is complete.
pub async fn write_package(dest: &Path, manifest: Vec<u8>, entries: Entries) -> Result<String> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating output directory", parent)?;
    }

    let partial = partial_path(dest);
    let partial_for_task = partial.clone();
    let written = tokio::task::spawn_blocking(move || {
        write_jar(&partial_for_task, &manifest, &entries)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Archive writer task panicked: {}", e)))?;

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            log::debug!("Failed to remove {}: {}", partial.display(), cleanup);
        }
        return Err(e);
    }

    tokio::fs::rename(&partial, dest)
        .await
        .fs_context("moving package into place", dest)?;
    calculate_sha256(dest).await
}

fn write_jar(path: &Path, manifest: &[u8], entries: &Entries) -> Result<()> {
    let file = std::fs::File::create(path).fs_context("creating package", path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    writer.start_file(MANIFEST_PATH, options)?;
    writer
        .write_all(manifest)
        .fs_context("writing package entry", path.join(MANIFEST_PATH))?;

    for (name, bytes) in entries {
        if name == MANIFEST_PATH {
            continue;
        }
        writer.start_file(name.as_str(), options)?;
        writer
            .write_all(bytes)
            .fs_context("writing package entry", path.join(name))?;
    }

    writer.finish()?;
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
    use crate::bundler::relocate::read_jar;

    fn entries() -> Entries {
        let mut entries = Entries::new();
        entries.insert("uniffi/einvoice/einvoice.kt".into(), b"package uniffi.einvoice".to_vec());
        entries.insert("linux-x86-64/libeinvoice.so".into(), b"\x7fELF".to_vec());
        entries.insert(MANIFEST_PATH.into(), b"stale".to_vec());
        entries
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_archives() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a/einvoice-1.0.0.jar");
        let b = dir.path().join("b/einvoice-1.0.0.jar");

        let sha_a = write_package(&a, manifest("einvoice", "1.0.0"), entries()).await.unwrap();
        let sha_b = write_package(&b, manifest("einvoice", "1.0.0"), entries()).await.unwrap();

        assert_eq!(sha_a, sha_b);
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
        assert!(!dir.path().join("a/einvoice-1.0.0.jar.partial").exists());
    }

    #[tokio::test]
    async fn manifest_comes_first_and_carries_version() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("einvoice-2.1.0.jar");
        write_package(&jar, manifest("einvoice", "2.1.0"), entries()).await.unwrap();

        let read = read_jar(&jar).unwrap();
        let names: Vec<_> = read.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [MANIFEST_PATH, "linux-x86-64/libeinvoice.so", "uniffi/einvoice/einvoice.kt"]
        );
        let manifest = String::from_utf8_lossy(&read[0].1).into_owned();
        assert!(manifest.contains("Implementation-Version: 2.1.0\r\n"));
    }
}
