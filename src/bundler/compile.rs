//! Host-language compile stage.
//!
//! Generated bindings are compiled into host code before packaging. The
//! compiler itself is external; a configured command line runs with
//! `{sources}` and `{classes}` substituted. Without a command the generated
//! sources are packaged unchanged.

use crate::bundler::{
    Error, Result, Settings,
    error::ErrorExt,
    generator::GeneratedBindingSet,
    utils::process::{ProcessError, Stream, render, run_streaming},
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

/// Placeholder replaced by the generated sources directory.
pub const SOURCES_PLACEHOLDER: &str = "{sources}";
/// Placeholder replaced by the compiled classes directory.
pub const CLASSES_PLACEHOLDER: &str = "{classes}";

/// Compiles generated bindings into host code.
#[async_trait]
pub trait HostCompiler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Compiles `bindings` into `classes_dir`, which exists and is empty.
    async fn compile(&self, bindings: &GeneratedBindingSet, classes_dir: &Path) -> Result<()>;
}

/// Runs a configured compile command.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: Vec<String>,
}

impl CommandCompiler {
    /// Creates a compiler from `program arg...`.
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            crate::bail!("compile command must name a program");
        }
        Ok(Self { command })
    }

    fn expand(&self, sources: &Path, classes: &Path) -> Vec<String> {
        let sources = sources.display().to_string();
        let classes = classes.display().to_string();
        self.command
            .iter()
            .map(|arg| {
                arg.replace(SOURCES_PLACEHOLDER, &sources)
                    .replace(CLASSES_PLACEHOLDER, &classes)
            })
            .collect()
    }
}

#[async_trait]
impl HostCompiler for CommandCompiler {
    fn name(&self) -> &str {
        &self.command[0]
    }

    async fn compile(&self, bindings: &GeneratedBindingSet, classes_dir: &Path) -> Result<()> {
        let expanded = self.expand(&bindings.out_dir, classes_dir);
        let (program, args) = expanded
            .split_first()
            .ok_or_else(|| Error::GenericError("empty compile command".into()))?;
        let rendered = render(program, args);
        log::info!("Compiling bindings: {}", rendered);

        let mut command = Command::new(program);
        command.args(args);

        let output = run_streaming(command, None, |stream, line| match stream {
            Stream::Stdout => log::debug!("[compile] {line}"),
            Stream::Stderr => log::debug!("[compile:stderr] {line}"),
        })
        .await;

        match output {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(Error::CompileFailed {
                command: rendered,
                code: output.status.code(),
                stderr: output.stderr,
            }),
            Err(ProcessError::Spawn(e)) => Err(Error::CompileFailed {
                command: rendered,
                code: None,
                stderr: format!("failed to start: {e}"),
            }),
            Err(ProcessError::Wait(e)) => Err(Error::IoError(e)),
            Err(ProcessError::TimedOut) => Err(Error::CompileFailed {
                command: rendered,
                code: None,
                stderr: "timed out".into(),
            }),
        }
    }
}

/// Packages generated sources as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompiler;

#[async_trait]
impl HostCompiler for PassthroughCompiler {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn compile(&self, bindings: &GeneratedBindingSet, classes_dir: &Path) -> Result<()> {
        for file in &bindings.files {
            let src = bindings.out_dir.join(file);
            let dest = classes_dir.join(file);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .fs_context("creating classes directory", parent)?;
            }
            tokio::fs::copy(&src, &dest)
                .await
                .fs_context("copying generated source", &src)?;
        }
        log::debug!("Staged {} generated source(s) without compiling", bindings.files.len());
        Ok(())
    }
}

/// Selects the compiler configured in `settings`.
pub fn compiler_for(settings: &Settings) -> Result<Arc<dyn HostCompiler>> {
    Ok(match settings.compile_command() {
        Some(command) => Arc::new(CommandCompiler::new(command.to_vec())?),
        None => Arc::new(PassthroughCompiler),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn bindings(dir: &Path) -> GeneratedBindingSet {
        let out_dir = dir.join("generated");
        std::fs::create_dir_all(out_dir.join("uniffi/einvoice")).unwrap();
        std::fs::write(out_dir.join("uniffi/einvoice/einvoice.kt"), b"package uniffi.einvoice").unwrap();
        GeneratedBindingSet {
            out_dir,
            generator_version: None,
            library: dir.join("libeinvoice.so"),
            library_sha256: String::new(),
            files: vec![PathBuf::from("uniffi/einvoice/einvoice.kt")],
        }
    }

    #[test]
    fn placeholders_are_substituted() {
        let compiler =
            CommandCompiler::new(vec!["kotlinc".into(), "{sources}".into(), "-d".into(), "{classes}".into()])
                .unwrap();
        assert_eq!(
            compiler.expand(Path::new("/gen"), Path::new("/out")),
            ["kotlinc", "/gen", "-d", "/out"]
        );
        assert!(CommandCompiler::new(vec![]).is_err());
    }

    #[tokio::test]
    async fn passthrough_copies_generated_sources() {
        let dir = tempfile::tempdir().unwrap();
        let set = bindings(dir.path());
        let classes = dir.path().join("classes");

        PassthroughCompiler.compile(&set, &classes).await.unwrap();
        assert!(classes.join("uniffi/einvoice/einvoice.kt").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_compile_failure() {
        let dir = tempfile::tempdir().unwrap();
        let set = bindings(dir.path());
        let compiler = CommandCompiler::new(vec![
            "sh".into(),
            "-c".into(),
            "echo 'unresolved reference' >&2; exit 2".into(),
        ])
        .unwrap();

        let err = compiler.compile(&set, &dir.path().join("classes")).await.unwrap_err();
        match err {
            Error::CompileFailed { code, stderr, .. } => {
                assert_eq!(code, Some(2));
                assert!(stderr.contains("unresolved reference"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
