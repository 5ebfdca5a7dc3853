//! Diagnostics reported while parsing and executing configuration files
//!
//! Every diagnostic renders as a single line:
//! `error: <file>:<line>:<col>: <context>: <message>`, with the parts that do
//! not apply left out.

use crate::parser::Location;
use amethyst_core::{Error, ErrorKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub col: Option<usize>,
    /// Directive, block, module or variable the message is about
    pub context: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            file: None,
            line: None,
            col: None,
            context: None,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(ErrorKind::Validation, message)
        }
    }

    /// Diagnostic for an error returned by a handler
    pub fn from_error(err: &Error) -> Self {
        Self::error(err.kind(), err.message())
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_col(mut self, col: usize) -> Self {
        self.col = Some(col);
        self
    }

    /// File, line and column of a node
    pub fn at(self, location: &Location) -> Self {
        self.in_file(location.file.clone())
            .at_line(location.line)
            .at_col(location.col)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Mirror the diagnostic into the tracing log
    pub(crate) fn trace(&self) {
        match self.severity {
            Severity::Error => tracing::error!(kind = ?self.kind, "{}", self),
            Severity::Warning => tracing::warn!("{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(file) = &self.file {
            write!(f, "{}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(col) = self.col {
                    write!(f, ":{}", col)?;
                }
            }
            write!(f, ": ")?;
        }
        if let Some(context) = &self.context {
            write!(f, "{}: ", context)?;
        }
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_format() {
        let loc = Location {
            file: "amethyst.conf".to_string(),
            line: 3,
            col: 5,
        };
        let d = Diagnostic::error(ErrorKind::Validation, "not a valid port number")
            .at(&loc)
            .with_context("Listen");
        assert_eq!(
            d.to_string(),
            "error: amethyst.conf:3:5: Listen: not a valid port number"
        );
    }

    #[test]
    fn test_partial_formats() {
        let d = Diagnostic::error(ErrorKind::Environment, "no such environment variable")
            .in_file("a.conf")
            .at_line(7)
            .with_context("$HOME_DIR");
        assert_eq!(d.to_string(), "error: a.conf:7: $HOME_DIR: no such environment variable");

        let d = Diagnostic::error(ErrorKind::Validation, "certificate missing").with_context("tls");
        assert_eq!(d.to_string(), "error: tls: certificate missing");

        let d = Diagnostic::error(ErrorKind::Io, "no such file").in_file("missing.conf");
        assert_eq!(d.to_string(), "error: missing.conf: no such file");
    }

    #[test]
    fn test_warning() {
        let d = Diagnostic::warning("deprecated").with_context("Foo");
        assert!(!d.is_error());
        assert_eq!(d.to_string(), "warning: Foo: deprecated");
    }

    #[derive(Clone, Default)]
    struct Capture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_trace_level_follows_severity() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            Diagnostic::error(ErrorKind::Validation, "bad port").trace();
            Diagnostic::warning("shouting is rude").trace();
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2, "{output}");
        assert!(lines[0].contains("ERROR") && lines[0].contains("error: bad port"));
        assert!(lines[1].contains("WARN") && lines[1].contains("warning: shouting is rude"));
    }
}
