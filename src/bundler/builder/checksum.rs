//! SHA-256 digests for native binaries, staged files and the final archive.

use crate::bundler::{Result, error::ErrorExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Calculates the SHA-256 of a file.
///
/// Reads the file in 8KB chunks to handle large files efficiently.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash (64 characters)
/// * `Err` - If the file cannot be read
pub async fn calculate_sha256(file_path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(file_path)
        .await
        .fs_context("opening file for hashing", file_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", file_path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory buffer, hex-encoded.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[tokio::test]
    async fn file_and_buffer_digests_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libeinvoice.so");
        std::fs::write(&path, b"\x7fELF").unwrap();

        assert_eq!(calculate_sha256(&path).await.unwrap(), sha256_bytes(b"\x7fELF"));
        assert_eq!(sha256_bytes(b""), EMPTY);
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let err = calculate_sha256(Path::new("/nonexistent/lib.so")).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/lib.so"));
    }
}
