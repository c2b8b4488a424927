//! Error kinds for dg-trainer operations

use crate::ErrorStatus;
use std::fmt;

/// What went wrong, grouped by the stage of a run that failed.
///
/// Match on the kind to pick an exit path; use [`ErrorStatus`] to decide
/// whether trying again could help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Setup: flags, request files, environment
    /// Missing credentials, unknown provider, bad model spec
    ConfigInvalid,
    /// A request or flag value no session can satisfy
    InvalidArgument,

    // Talking to the provider
    AuthenticationFailed,
    RateLimited,
    NetworkFailed,
    /// 5xx or overloaded
    ProviderUnavailable,
    /// The provider answered with an error we have no better kind for
    InferenceFailed,

    // Reading and writing data
    /// Request JSON or a provider payload did not parse
    ParseFailed,
    /// The model's session failed to parse or validate
    OutputInvalid,
    SerializationFailed,

    // Files
    FileNotFound,
    PermissionDenied,
    IoFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::OutputInvalid => "OutputInvalid",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Status a fresh error of this kind starts with.
    ///
    /// Transient provider failures and rejected model output may succeed on
    /// another call; everything else needs the user to change something.
    pub fn default_status(&self) -> ErrorStatus {
        match self {
            ErrorKind::InferenceFailed
            | ErrorKind::NetworkFailed
            | ErrorKind::RateLimited
            | ErrorKind::ProviderUnavailable
            | ErrorKind::OutputInvalid => ErrorStatus::Temporary,
            _ => ErrorStatus::Permanent,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
