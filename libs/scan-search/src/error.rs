//! Error types for search specification handling

use crate::schema::ValueKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed search request: {0}")]
    MalformedInput(String),

    #[error("Unknown search operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid search parameter: {0}")]
    InvalidField(String),

    #[error("Value for {field} must be {expected}")]
    TypeMismatch { field: String, expected: ValueKind },

    #[error("Values for {0} must be array")]
    NotAnArray(String),

    #[error("Operator '{operator}' is not supported for {kind} field {field}")]
    UnsupportedOperator {
        field: String,
        operator: String,
        kind: ValueKind,
    },

    #[error("Invalid regex for {field}: {message}")]
    InvalidPattern { field: String, message: String },

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Wrap a datastore failure. The message is kept verbatim; callers decide
    /// whether it is transient.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Error::Backend(err.to_string())
    }

    /// `true` for failures caused by the request itself (400-class), `false`
    /// for datastore failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Backend(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedInput(err.to_string())
    }
}
