//! Error taxonomy shared by the server components.
//!
//! Every error raised while serving a connection is one of these variants.
//! The connection handler turns them into an error response with
//! [`Error::client_message`], which never exposes file paths or I/O details.

use std::io;
use thiserror::Error;

/// Errors produced while parsing, dispatching or executing a command.
#[derive(Error, Debug)]
pub enum Error {
    /// The request line could not be decoded into a command.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// The verb is not present in the dispatcher's table.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The course catalog could not be opened or read.
    #[error("course catalog unavailable: {0}")]
    StoreUnavailable(#[source] io::Error),

    /// A single catalog or log line did not split into the expected fields.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A registration form holds a value that cannot be written as a record.
    #[error("invalid registration form: {0}")]
    InvalidForm(String),

    /// The registration log could not be opened or appended to.
    #[error("failed to persist registration: {0}")]
    PersistenceError(#[source] io::Error),

    /// Transport-level failure on the client connection.
    #[error("connection error: {0}")]
    ConnectionError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Text sent back to the client for this error.
    pub fn client_message(&self) -> String {
        match self {
            Error::MalformedCommand(msg) => format!("malformed command: {msg}"),
            Error::UnknownCommand(verb) => format!("unknown command: {verb}"),
            Error::InvalidForm(msg) => format!("invalid registration form: {msg}"),
            Error::StoreUnavailable(_) | Error::MalformedRecord { .. } => {
                "course catalog is currently unavailable".to_string()
            }
            Error::PersistenceError(_) => "registration could not be recorded".to_string(),
            Error::ConnectionError(_) => "internal server error".to_string(),
        }
    }
}
