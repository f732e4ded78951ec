//! Terminal rendering of stage errors.
//!
//! ```text
//! error[native build]: native library build failed
//!   --> cache/linux/release/build/Release
//!    | ../../src/VoIPController.cpp:12:1: error: expected ';'
//!   = help: fix the compiler error above and rerun `extforge build`
//! ```
//!
//! Tool output is reproduced line for line behind a gutter and is never
//! reflowed or trimmed.

use std::fmt;
use std::path::PathBuf;

const RED: &str = "\x1b[1;31m";
const YELLOW: &str = "\x1b[1;33m";
const BLUE: &str = "\x1b[1;34m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        }
    }
}

/// A rendered error or warning.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Pipeline stage that raised it
    pub stage: Option<&'static str>,
    pub location: Option<PathBuf>,
    pub notes: Vec<String>,
    /// Verbatim output of the failing tool
    pub output: Option<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            stage: None,
            location: None,
            notes: Vec::new(),
            output: None,
            help: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_stage(mut self, stage: &'static str) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attach tool output; empty output is dropped.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        let output = output.into();
        if !output.trim().is_empty() {
            self.output = Some(output);
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    pub fn format(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("{}{}{}", code, text, RESET)
            } else {
                text.to_string()
            }
        };

        let head = match self.stage {
            Some(stage) => format!("{}[{}]", self.severity.label(), stage),
            None => self.severity.label().to_string(),
        };

        let mut out = format!("{}: {}\n", paint(self.severity.color(), &head), self.message);

        if let Some(path) = &self.location {
            out.push_str(&format!("  {} {}\n", paint(BLUE, "-->"), path.display()));
        }
        if let Some(output) = &self.output {
            for line in output.lines() {
                out.push_str(&format!("   {} {}\n", paint(BLUE, "|"), line));
            }
        }
        for note in &self.notes {
            out.push_str(&format!("  {} note: {}\n", paint(BLUE, "="), note));
        }
        for help in &self.help {
            out.push_str(&format!("  {} help: {}\n", paint(BLUE, "="), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
