use std::fmt::{Display, Formatter, Result};

use core_types::CoreTypeError;
use remote_session::RemoteError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A single remote request failed. The remote error is kept as is.
    RemoteCallFailed(RemoteError),
    /// The server refused a paged query because it scans too many entries.
    ThresholdExceeded(String),
    /// Rejected before any remote call was made.
    PreconditionViolation(String),
    AlreadyExists(String),
    NotFound(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Error::RemoteCallFailed(err) => write!(f, "Remote call failed: {}", err),
            Error::ThresholdExceeded(message) => write!(
                f,
                "List view threshold exceeded ({}). If you are using a custom query, set a row limit. \
                 If a row limit is not enough, create an index on the collection and filter on that column.",
                message
            ),
            Error::PreconditionViolation(message) => write!(f, "Invalid input: {}", message),
            Error::AlreadyExists(message) => write!(f, "Already exists: {}", message),
            Error::NotFound(message) => write!(f, "Not found: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        Error::RemoteCallFailed(err)
    }
}

impl From<CoreTypeError> for Error {
    fn from(err: CoreTypeError) -> Self {
        Error::PreconditionViolation(err.to_string())
    }
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> std::result::Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::PreconditionViolation(format!("{} must not be empty", what)));
    }
    Ok(())
}
