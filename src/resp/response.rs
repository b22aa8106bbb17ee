use std::{collections::HashSet, fmt, hash::Hash};

use bytes::Bytes;

use super::{Error, Frame};

/// The outcome of reading one reply from the server.
///
/// A response holds either the decoded [`Frame`] (which may itself be nil) or the failure
/// that was captured while producing it: an error sent by the server, or a transport or
/// protocol error. It is built once and never changes afterward.
///
/// Typed accessors return `Ok(None)` when the reply is nil, and [`Error::TypeMismatch`]
/// when the reply has a different shape than the one asked for.
#[derive(Debug, Clone)]
pub struct Response {
    inner: Result<Frame, Error>,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(frame: Frame) -> Self {
        Self { inner: Ok(frame) }
    }

    /// Creates a failed response.
    pub fn err(err: Error) -> Self {
        Self { inner: Err(err) }
    }

    /// Returns `true` if no failure was captured.
    pub fn is_success(&self) -> bool {
        self.inner.is_ok()
    }

    /// Returns `true` if the reply was decoded successfully and is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self.inner, Ok(Frame::Null))
    }

    /// Get the captured failure, if any.
    pub fn error(&self) -> Option<&Error> {
        self.inner.as_ref().err()
    }

    /// Get the decoded reply, or the captured failure.
    pub fn raw(&self) -> Result<&Frame, Error> {
        self.inner.as_ref().map_err(Clone::clone)
    }

    /// Consumes the response, returning the decoded reply or the captured failure.
    pub fn into_result(self) -> Result<Frame, Error> {
        self.inner
    }

    /// Get the content of a simple or bulk string reply.
    pub fn bytes(&self) -> Result<Option<&Bytes>, Error> {
        match self.raw()? {
            Frame::SimpleString(b) | Frame::BulkString(b) => Ok(Some(b)),
            Frame::Null => Ok(None),
            frame => Err(mismatch("string", frame)),
        }
    }

    /// Get the value of an integer reply.
    pub fn integer(&self) -> Result<Option<i64>, Error> {
        match self.raw()? {
            Frame::Integer(i) => Ok(Some(*i)),
            Frame::Null => Ok(None),
            frame => Err(mismatch("integer", frame)),
        }
    }

    /// Get the elements of an array reply.
    pub fn array(&self) -> Result<Option<&[Frame]>, Error> {
        match self.raw()? {
            Frame::Array(items) => Ok(Some(items)),
            Frame::Null => Ok(None),
            frame => Err(mismatch("array", frame)),
        }
    }

    /// Get the content of a simple or bulk string reply as an UTF-8 string.
    pub fn string(&self) -> Result<Option<String>, Error> {
        match self.bytes()? {
            Some(b) => Ok(Some(std::str::from_utf8(b)?.to_string())),
            None => Ok(None),
        }
    }

    /// Convert each element of an array reply, keeping their order.
    pub fn list<T, F>(&self, converter: F) -> Result<Option<Vec<T>>, Error>
    where
        F: FnMut(&Frame) -> T,
    {
        Ok(self
            .array()?
            .map(|items| items.iter().map(converter).collect()))
    }

    /// Convert each element of an array reply, dropping duplicates.
    pub fn set<T, F>(&self, converter: F) -> Result<Option<HashSet<T>>, Error>
    where
        T: Eq + Hash,
        F: FnMut(&Frame) -> T,
    {
        Ok(self
            .array()?
            .map(|items| items.iter().map(converter).collect()))
    }
}

fn mismatch(expected: &'static str, frame: &Frame) -> Error {
    Error::TypeMismatch {
        expected,
        actual: frame.kind(),
    }
}

impl From<Result<Frame, Error>> for Response {
    fn from(inner: Result<Frame, Error>) -> Self {
        Self { inner }
    }
}

/// Renders the response the same way `redis-cli` does.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Ok(frame) => write!(f, "{}", frame),
            Err(Error::Server(msg)) => write!(f, "(error) {}", msg),
            Err(err) => write!(f, "(failure) {}", err),
        }
    }
}
