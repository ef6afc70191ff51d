//! JSON report written next to the package.

use crate::bundler::{
    PlatformClass, Result, Warning, assembler::StagedNative, error::ErrorExt,
    relocate::RelocationReport,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything a release operator needs to audit one package.
#[derive(Clone, Debug, Serialize)]
pub struct PackageReport {
    /// Package name
    pub package: String,
    /// Version shared by the native library and the package
    pub version: String,
    /// Final archive
    pub archive: PathBuf,
    /// SHA-256 of the archive
    pub sha256: String,
    /// When the package was produced
    pub created_at: DateTime<Utc>,
    /// Platform class of the build host
    pub host_platform: PlatformClass,
    /// Generator version, if it reported one
    pub generator_version: Option<String>,
    /// SHA-256 of the native library bindings were generated from
    pub library_sha256: String,
    /// One native binary per packaged platform class
    pub platforms: Vec<StagedNative>,
    /// Relocation outcome
    pub relocation: RelocationReport,
    /// Non-fatal anomalies raised during the run
    pub warnings: Vec<Warning>,
}

impl PackageReport {
    /// Report path for an archive: `einvoice-1.0.0.jar` → `einvoice-1.0.0.report.json`.
    pub fn path_for(archive: &Path) -> PathBuf {
        archive.with_extension("report.json")
    }
}

/// Writes `report` as pretty-printed JSON and returns its path.
pub async fn write_report(report: &PackageReport) -> Result<PathBuf> {
    let path = PackageReport::path_for(&report.archive);
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(&path, json)
        .await
        .fs_context("writing package report", &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_serializes_warnings_with_kind() {
        let dir = tempfile::tempdir().unwrap();
        let report = PackageReport {
            package: "einvoice".into(),
            version: "1.0.0".into(),
            archive: dir.path().join("einvoice-1.0.0.jar"),
            sha256: "00".repeat(32),
            created_at: Utc::now(),
            host_platform: PlatformClass::LinuxX86_64,
            generator_version: None,
            library_sha256: "11".repeat(32),
            platforms: vec![],
            relocation: RelocationReport::default(),
            warnings: vec![Warning::OptionalPlatformMissing {
                platform: PlatformClass::DarwinAarch64,
            }],
        };

        let path = write_report(&report).await.unwrap();
        assert_eq!(path, dir.path().join("einvoice-1.0.0.report.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["host_platform"], "linux-x86-64");
        assert_eq!(json["warnings"][0]["kind"], "optional_platform_missing");
        assert_eq!(json["warnings"][0]["platform"], "darwin-aarch64");
    }
}
