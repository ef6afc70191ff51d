//! Operator-facing terminal output.
//!
//! Progress and diagnostics go to stderr so that stdout carries only command
//! results (the archive path, the resolved version). Status markers are
//! coloured when stderr is a terminal.

use cyrup_termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use std::io::{self, IsTerminal, Write};

/// Marker printed before a status line, and its colour.
#[derive(Debug, Clone, Copy)]
struct Marker {
    text: &'static str,
    color: Option<Color>,
    bold: bool,
}

const SECTION: Marker = Marker { text: "\n== ", color: Some(Color::Cyan), bold: true };
const PROGRESS: Marker = Marker { text: "→ ", color: Some(Color::Blue), bold: false };
const SUCCESS: Marker = Marker { text: "✓ ", color: Some(Color::Green), bold: true };
const WARNING: Marker = Marker { text: "⚠ warning: ", color: Some(Color::Yellow), bold: true };
const ERROR: Marker = Marker { text: "✗ error: ", color: Some(Color::Red), bold: true };
const PLAIN_VERBOSE: Marker = Marker { text: "  ", color: None, bold: false };
const PLAIN_INDENT: Marker = Marker { text: "    ", color: None, bold: false };

/// Writes formatted status lines honouring verbosity.
#[derive(Debug, Clone, Copy)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    color: ColorChoice,
}

impl OutputManager {
    /// Creates an output manager. Colour is used only when stderr is a
    /// terminal.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let color = if io::stderr().is_terminal() {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self { verbose, quiet, color }
    }

    /// Whether verbose output is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Prints a message only in verbose mode.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose && !self.quiet {
            self.line(PLAIN_VERBOSE, message)?;
        }
        Ok(())
    }

    /// Prints a section header.
    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line(SECTION, &format!("{title} =="))
    }

    /// Prints a progress message.
    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line(PROGRESS, message)
    }

    /// Prints a success message.
    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line(SUCCESS, message)
    }

    /// Prints a warning. Warnings are shown even in quiet mode.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.line(WARNING, message)
    }

    /// Prints an error.
    pub fn error(&self, message: &str) -> io::Result<()> {
        self.line(ERROR, message)
    }

    /// Prints indented passthrough text (e.g. generator output).
    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line(PLAIN_INDENT, message)
    }

    fn line(&self, marker: Marker, message: &str) -> io::Result<()> {
        let stderr = StandardStream::stderr(self.color);
        let mut out = stderr.lock();
        write_marked(&mut out, marker, message)
    }
}

/// Writes `marker` in its colour, then `message` uncoloured.
fn write_marked<W: WriteColor>(out: &mut W, marker: Marker, message: &str) -> io::Result<()> {
    if marker.color.is_some() {
        out.set_color(ColorSpec::new().set_fg(marker.color).set_bold(marker.bold))?;
        write!(out, "{}", marker.text)?;
        out.reset()?;
    } else {
        write!(out, "{}", marker.text)?;
    }
    writeln!(out, "{message}")
}
