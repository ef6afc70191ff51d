use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn write_config(dir: &Path, manifest: &Path) -> PathBuf {
    let config = dir.join("bundle.toml");
    std::fs::write(
        &config,
        format!(
            "[package]\nname = \"einvoice\"\nmanifest = {:?}\n\n[generator]\nrelease_dir = \"target/release\"\n",
            manifest.display().to_string()
        ),
    )
    .unwrap();
    config
}

fn bundler() -> Command {
    let mut cmd = Command::cargo_bin("ffi_bundler").unwrap();
    cmd.env_remove("FFI_BUNDLER_CONFIG");
    cmd
}

#[test]
fn version_prints_manifest_version() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &fixture("Cargo.toml"));

    bundler()
        .args(["--config", config.to_str().unwrap(), "version"])
        .assert()
        .success()
        .stdout("0.3.1\n");
}

#[test]
fn missing_version_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &fixture("Unversioned.toml"));

    bundler()
        .args(["--config", config.to_str().unwrap(), "version"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no version declaration found"));
}

#[test]
fn export_must_be_a_tarball() {
    bundler()
        .args(["assemble", "--export", "natives.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must end in .tar.gz"));
}

#[test]
fn assemble_without_config_stages_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let release = dir.path().join("release");
    std::fs::create_dir_all(&release).unwrap();
    std::fs::write(release.join("libeinvoice.so"), b"linux native").unwrap();
    let staging = dir.path().join("staging");
    let export = dir.path().join("linux-natives.tar.gz");

    bundler()
        .current_dir(dir.path())
        .args([
            "--config",
            "absent.toml",
            "assemble",
            "--staging-dir",
            staging.to_str().unwrap(),
            "--library",
            "einvoice",
            "--from",
            &format!("linux-x86-64={}", release.display()),
            "--export",
            export.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Staged linux-x86-64/libeinvoice.so"));

    assert_eq!(
        std::fs::read(staging.join("linux-x86-64/libeinvoice.so")).unwrap(),
        b"linux native"
    );
    assert!(export.is_file());
}

#[test]
fn assemble_with_config_stages_under_the_manifest_version() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &fixture("Cargo.toml"));
    let release = dir.path().join("target/release");
    std::fs::create_dir_all(&release).unwrap();
    std::fs::write(release.join("libeinvoice.so"), b"linux native").unwrap();

    bundler()
        .args(["--config", config.to_str().unwrap(), "assemble"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read(dir.path().join("build/libs/natives/0.3.1/linux-x86-64/libeinvoice.so")).unwrap(),
        b"linux native"
    );
}

#[cfg(target_os = "linux")]
mod pipeline {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Lays out a native workspace whose generator is a shell script.
    fn workspace(dir: &Path, generator_body: &str) -> PathBuf {
        let release = dir.join("target/release");
        std::fs::create_dir_all(&release).unwrap();
        std::fs::write(release.join("libeinvoice.so"), b"linux native").unwrap();

        let script = release.join("uniffi-bindgen");
        std::fs::write(&script, format!("#!/bin/sh\n{generator_body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        write_config(dir, &fixture("Cargo.toml"))
    }

    #[test]
    fn package_writes_versioned_archive() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = workspace(
            dir.path(),
            r#"[ "$1" = "--version" ] && { echo "uniffi-bindgen 0.28.0"; exit 0; }
mkdir -p "$7/uniffi/einvoice" && echo "package uniffi.einvoice" > "$7/uniffi/einvoice/einvoice.kt"
echo "generated bindings""#,
        );

        bundler()
            .args(["--config", config.to_str().unwrap(), "package"])
            .assert()
            .success()
            .stdout(predicate::str::ends_with("einvoice-0.3.1.jar\n"))
            .stderr(predicate::str::contains("generated bindings"))
            .stderr(predicate::str::contains("no native binary staged for darwin-aarch64"));

        let archive = dir.path().join("build/libs/einvoice-0.3.1.jar");
        assert!(archive.is_file());
        assert!(dir.path().join("build/libs/einvoice-0.3.1.report.json").is_file());
        Ok(())
    }

    #[test]
    fn generator_failure_produces_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(
            dir.path(),
            r#"[ "$1" = "--version" ] && exit 0
echo "error: library has no uniffi metadata" >&2
exit 3"#,
        );

        bundler()
            .args(["--config", config.to_str().unwrap(), "package"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("exit code: 3"))
            .stderr(predicate::str::contains("library has no uniffi metadata"));

        assert!(!dir.path().join("build/libs/einvoice-0.3.1.jar").exists());
    }

    #[test]
    fn generator_output_that_is_not_utf8_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(
            dir.path(),
            r#"[ "$1" = "--version" ] && exit 0
printf 'scanning caf\351 symbols\n'
mkdir -p "$7" && echo "// bindings" > "$7/einvoice.kt""#,
        );

        bundler()
            .args(["--config", config.to_str().unwrap(), "package"])
            .assert()
            .success()
            .stderr(predicate::str::contains("scanning caf\u{FFFD} symbols"));

        assert!(dir.path().join("build/libs/einvoice-0.3.1.jar").is_file());
    }

    #[test]
    fn strict_platform_is_accepted_on_linux() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(
            dir.path(),
            r#"[ "$1" = "--version" ] && exit 0
mkdir -p "$7" && echo "// bindings" > "$7/einvoice.kt""#,
        );

        bundler()
            .args([
                "--config",
                config.to_str().unwrap(),
                "package",
                "--strict-platform",
                "--output-dir",
                dir.path().join("dist").to_str().unwrap(),
            ])
            .assert()
            .success();

        assert!(dir.path().join("dist/einvoice-0.3.1.jar").is_file());
    }
}
