use std::{io, str::Utf8Error, sync::Arc};

use thiserror::Error as ThisError;

/// Errors that can be observed when talking to a RESP server.
///
/// The type is cheap to clone so that a failure captured inside a [`Response`] can be
/// handed out again every time the response is inspected.
///
/// [`Response`]: crate::resp::Response
#[derive(ThisError, Debug, Clone)]
pub enum Error {
    /// The server replied with an error, e.g. `-ERR wrong type`
    #[error("{0}")]
    Server(String),

    /// Reading from or writing to the transport failed
    #[error("I/O error - {0}")]
    Io(#[source] Arc<io::Error>),

    /// The bytes received from the server do not follow the protocol
    #[error("Protocol error - {0}")]
    Protocol(#[from] ProtocolError),

    /// The decoded value does not have the shape that was asked for
    #[error("Type mismatch - expected {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the requested shape
        expected: &'static str,
        /// Name of the decoded shape
        actual: &'static str,
    },

    /// The decoded bytes could not be read as an UTF-8 string
    #[error("Could not parse bytes as an UTF-8 string - {0}")]
    NotUtf8(#[from] Utf8Error),

    /// The connection was closed, either explicitly or after a fatal failure
    #[error("Connection is closed")]
    Closed,
}

impl Error {
    /// Returns `true` if the connection that produced this error can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Protocol(_) | Error::Closed)
    }

    /// Get the message sent by the server if this is a server error.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Server(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

/// Malformed or unexpected bytes encountered while decoding a value.
///
/// Any of these leaves the stream at an unknown position, there is no way to find the
/// start of the next value afterward.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The leading byte is not one of `+`, `-`, `:`, `$`, `*`
    #[error("Invalid type marker {0:#x}")]
    InvalidTypeMarker(u8),

    /// A line or a bulk string was not terminated by "\r\n"
    #[error("Missing CRLF terminator")]
    MissingCrlf,

    /// Could not read bytes as integer
    #[error("Could not parse bytes as an integer (got {0})")]
    NotInteger(String),

    /// A length prefix is negative but not -1
    #[error("Invalid length {0}")]
    InvalidLength(i64),

    /// A bulk string exceeds the maximum size allowed by the protocol
    #[error("Bulk string too large ({0} bytes)")]
    TooLarge(usize),

    /// No "\r\n" was found within the maximum length of a line
    #[error("Line longer than {0} bytes")]
    LineTooLong(usize),
}
