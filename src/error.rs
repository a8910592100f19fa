use std::fmt::Display;

pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by a simulation operation.
///
/// No error is fatal to the simulation. Every error is reported back to
/// the caller, usually the command interpreter, and leaves unrelated state
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, e.g. an invalid address or a missing field.
    Validation,
    /// A resource is already taken, e.g. an address, a port or a service.
    Conflict,
    /// An unknown service, entity or console.
    NotFound,
    /// An equivalent operation is still in flight.
    State,
    /// An external resource, like a fixture file, could not be used.
    ExternalResource,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::State, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalResource, message)
    }

    /// Prefixes the message with some context.
    #[must_use]
    pub fn context(mut self, context: impl Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }
}

impl PartialEq<ErrorKind> for Error {
    fn eq(&self, other: &ErrorKind) -> bool {
        self.kind == *other
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            Validation => write!(f, "validation error"),
            Conflict => write!(f, "conflict"),
            NotFound => write!(f, "not found"),
            State => write!(f, "invalid state"),
            ExternalResource => write!(f, "external resource error"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::external(format!("IO: {err}"))
    }
}

impl From<serde_yml::Error> for Error {
    fn from(err: serde_yml::Error) -> Self {
        Error::external(format!("YAML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_compare() {
        let err = Error::conflict("address 192.168.1.10 is already in use");
        assert_eq!(err, ErrorKind::Conflict);
        assert_ne!(err, ErrorKind::NotFound);
        assert_eq!(err.to_string(), "address 192.168.1.10 is already in use");
    }

    #[test]
    fn context_prefixes() {
        let err = Error::validation("invalid port 0").context("AMF-1");
        assert_eq!(err.to_string(), "AMF-1: invalid port 0");
        assert_eq!(ErrorKind::Validation.to_string(), "validation error");
    }
}
