//! The binding generator as an external command.

use super::{BindingGenerator, GenerationRequest};
use crate::bundler::{
    Error, Result,
    builder::tool_detection::locate_tool,
    settings::GeneratorSettings,
    utils::process::{ProcessError, Stream, render, run_streaming},
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Receives every line the generator prints, as it is printed.
pub type LineSink = Arc<dyn Fn(Stream, &str) + Send + Sync>;

/// How long `--version` may take before it is given up on.
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `<program> generate --library <lib> --language <lang> --out-dir <dir>`
/// from the native library's release directory.
pub struct CommandGenerator {
    name: String,
    program: PathBuf,
    working_dir: PathBuf,
    timeout: Option<Duration>,
    on_line: LineSink,
}

impl std::fmt::Debug for CommandGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGenerator")
            .field("program", &self.program)
            .field("working_dir", &self.working_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CommandGenerator {
    /// Creates a generator from settings. Output lines go to the debug log
    /// until [`with_output`](Self::with_output) is called.
    pub fn new(settings: &GeneratorSettings) -> Self {
        Self {
            name: settings.program.display().to_string(),
            program: settings.program.clone(),
            working_dir: settings.release_dir.clone(),
            timeout: settings.timeout,
            on_line: Arc::new(|stream, line| match stream {
                Stream::Stdout => log::debug!("[generator] {line}"),
                Stream::Stderr => log::debug!("[generator:stderr] {line}"),
            }),
        }
    }

    /// Forwards generator output to `sink`.
    pub fn with_output(mut self, sink: LineSink) -> Self {
        self.on_line = sink;
        self
    }

    fn locate(&self) -> Result<PathBuf> {
        locate_tool(&self.program, &self.working_dir)
    }
}

#[async_trait]
impl BindingGenerator for CommandGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn version(&self) -> Option<String> {
        let program = self.locate().ok()?;
        let mut command = Command::new(&program);
        command.arg("--version").current_dir(&self.working_dir);

        match run_streaming(command, Some(VERSION_PROBE_TIMEOUT), |_, _| {}).await {
            Ok(output) if output.status.success() => {
                let version = output.stdout.trim().to_string();
                (!version.is_empty()).then_some(version)
            }
            Ok(output) => {
                log::debug!(
                    "{} --version exited with {:?}; version unknown",
                    self.name,
                    output.status.code()
                );
                None
            }
            Err(e) => {
                log::debug!("{} --version could not be run: {:?}", self.name, e);
                None
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<()> {
        let program = self.locate()?;
        let args = vec![
            "generate".to_string(),
            "--library".to_string(),
            request.library.display().to_string(),
            "--language".to_string(),
            request.language.clone(),
            "--out-dir".to_string(),
            request.out_dir.display().to_string(),
        ];
        let rendered = render(&program.display().to_string(), &args);
        log::debug!("Running {} (in {})", rendered, self.working_dir.display());

        let mut command = Command::new(&program);
        command.args(&args).current_dir(&self.working_dir);

        let on_line = &self.on_line;
        match run_streaming(command, self.timeout, |stream, line| on_line(stream, line)).await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(Error::GenerationFailed {
                program: rendered,
                code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Err(ProcessError::TimedOut) => Err(Error::GeneratorTimedOut {
                program: rendered,
                secs: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            }),
            Err(ProcessError::Spawn(e)) => Err(Error::GenerationFailed {
                program: rendered,
                code: None,
                stdout: String::new(),
                stderr: format!("failed to start: {e}"),
            }),
            Err(ProcessError::Wait(e)) => Err(Error::IoError(e)),
        }
    }
}
