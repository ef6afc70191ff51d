//! External process execution with streamed, captured output.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Which stream a line came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// Outcome of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status
    pub status: ExitStatus,
    /// Captured standard output, decoded lossily
    pub stdout: String,
    /// Captured standard error, decoded lossily
    pub stderr: String,
}

/// Why a process produced no [`ProcessOutput`].
#[derive(Debug)]
pub enum ProcessError {
    /// The program could not be started.
    Spawn(std::io::Error),
    /// Waiting on the child failed.
    Wait(std::io::Error),
    /// The timeout elapsed; the child was killed.
    TimedOut,
}

/// Runs `command`, forwarding each output line to `on_line` as it arrives
/// and capturing both streams verbatim.
///
/// Without a timeout the call waits for the child indefinitely.
pub async fn run_streaming<F>(
    mut command: Command,
    timeout: Option<Duration>,
    on_line: F,
) -> Result<ProcessOutput, ProcessError>
where
    F: Fn(Stream, &str),
{
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(ProcessError::Spawn)?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Drain both pipes concurrently so neither can fill up and block the child
    let drain = async {
        tokio::join!(
            drain_lines(stdout, Stream::Stdout, &on_line),
            drain_lines(stderr, Stream::Stderr, &on_line),
        )
    };

    let finished = async {
        let (stdout, stderr) = drain.await;
        let status = child.wait().await;
        (stdout, stderr, status)
    };

    let (stdout, stderr, status) = match timeout {
        None => finished.await,
        Some(limit) => match tokio::time::timeout(limit, finished).await {
            Ok(result) => result,
            Err(_elapsed) => {
                // kill_on_drop reaps the child once the future is dropped
                return Err(ProcessError::TimedOut);
            }
        },
    };

    let status = status.map_err(ProcessError::Wait)?;
    Ok(ProcessOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Forwards each line to `on_line` and returns the stream's raw bytes.
///
/// Lines are split on `\n` without decoding, so bytes that are not valid
/// UTF-8 reach the sink lossily and never stop the drain before EOF.
async fn drain_lines<R, F>(reader: Option<R>, stream: Stream, on_line: &F) -> Vec<u8>
where
    R: AsyncRead + Unpin,
    F: Fn(Stream, &str),
{
    let mut captured = Vec::new();
    let Some(reader) = reader else {
        return captured;
    };

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                captured.extend_from_slice(&line);
                let text = line.strip_suffix(b"\n").unwrap_or(&line);
                let text = text.strip_suffix(b"\r").unwrap_or(text);
                on_line(stream, &String::from_utf8_lossy(text));
            }
            Err(e) => {
                log::debug!("Stopped reading child {:?}: {}", stream, e);
                break;
            }
        }
    }
    captured
}

/// Renders a command line for error messages.
pub fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}
