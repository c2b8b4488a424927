//! The main Error type for dg-trainer

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The error returned by every dg-trainer operation.
///
/// Besides the kind and a message, an error records the operation that
/// raised it, whether another attempt could help, key/value context picked
/// up on the way out, and the underlying error if one exists.
///
/// # Example
///
/// ```rust
/// use dgtrainer_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::output_invalid("drills: expected 2 to 5 drills, got 6")
///     .with_operation("agent::run")
///     .with_context("attempts", "2")
///     .persist();
///
/// assert_eq!(err.kind(), ErrorKind::OutputInvalid);
/// assert_eq!(err.status(), ErrorStatus::Persistent);
/// assert_eq!(err.context_value("attempts"), Some("2"));
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create an error whose status is the kind's default
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: kind.default_status(),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error status
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context, oldest entry first
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up the first context value recorded under `key`
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    /// Record the operation. An earlier operation moves to context as "called".
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. Set at most once per error.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    /// The request itself is at fault; sending it again will not help
    pub fn permanent(mut self) -> Self {
        self.status = ErrorStatus::Permanent;
        self
    }

    /// Retries ran out
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }

    // Constructors for the kinds raised outside this crate

    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a ConfigInvalid error for a required environment variable
    pub fn missing_env(var: &'static str) -> Self {
        Self::new(ErrorKind::ConfigInvalid, format!("environment variable {} is not set", var))
            .with_context("env", var)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a ParseFailed error
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    /// Create an OutputInvalid error
    pub fn output_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutputInvalid, message)
    }

    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationFailed, message)
    }
}

/// One line for logs: `operation: Kind (status): message [key=value, ...]`
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.operation.is_empty() {
            write!(f, "{}: ", self.operation)?;
        }
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        let mut context = self.context.iter();
        if let Some((key, value)) = context.next() {
            write!(f, " [{}={}", key, value)?;
            for (key, value) in context {
                write!(f, ", {}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// The report `main` prints when a run fails
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.operation.is_empty() {
            write!(f, " in {}", self.operation)?;
        }
        writeln!(f)?;

        if !self.message.is_empty() {
            writeln!(f, "  {}", self.message)?;
        }
        for (key, value) in &self.context {
            writeln!(f, "  {}: {}", key, value)?;
        }
        if let Some(source) = &self.source {
            writeln!(f, "  caused by: {:#}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Request files are the only IO; map the cases a user can fix
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string()).set_source(err)
    }
}
