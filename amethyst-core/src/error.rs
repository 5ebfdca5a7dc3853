//! Error types for Amethyst

use thiserror::Error;

/// Result type for Amethyst operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Amethyst
///
/// The `Display` form carries the category prefix; diagnostics print
/// [`Error::message`] instead so the category does not repeat.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration text
    #[error("parse error: {0}")]
    Parse(String),

    /// Directive or block used where it is not allowed
    #[error("scope error: {0}")]
    Scope(String),

    /// Argument failed a handler's checks
    #[error("validation error: {0}")]
    Validation(String),

    /// Environment variable missing or malformed
    #[error("environment error: {0}")]
    Environment(String),

    /// Module could not be loaded or merged
    #[error("module load error: {0}")]
    ModuleLoad(String),

    /// Unknown directive or block name
    #[error("resolution error: {0}")]
    Resolution(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error category, used to classify diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Scope,
    Validation,
    Environment,
    ModuleLoad,
    Resolution,
    Io,
}

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn scope(msg: impl Into<String>) -> Self {
        Self::Scope(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment(msg.into())
    }

    pub fn module_load(msg: impl Into<String>) -> Self {
        Self::ModuleLoad(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Scope(_) => ErrorKind::Scope,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Environment(_) => ErrorKind::Environment,
            Self::ModuleLoad(_) => ErrorKind::ModuleLoad,
            Self::Resolution(_) => ErrorKind::Resolution,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// The message without its category prefix
    pub fn message(&self) -> String {
        match self {
            Self::Parse(m)
            | Self::Scope(m)
            | Self::Validation(m)
            | Self::Environment(m)
            | Self::ModuleLoad(m)
            | Self::Resolution(m) => m.clone(),
            Self::Io(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_category() {
        let err = Error::validation("not a valid port number");
        assert_eq!(err.to_string(), "validation error: not a valid port number");
        assert_eq!(err.message(), "not a valid port number");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
