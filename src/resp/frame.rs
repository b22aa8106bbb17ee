//! Data structures for representing values decoded from RESP

use std::{fmt, mem};

use bytes::Bytes;

/// A value in [Redis Serialization Protocol (RESP)] as received from the server.
///
/// Errors are not frames, a `-` reply is surfaced as [`Error::Server`] instead.
///
/// [Redis Serialization Protocol (RESP)]: https://redis.io/topics/protocol
/// [`Error::Server`]: crate::resp::Error::Server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A string that does not contain carriage-return nor line-feed.
    SimpleString(Bytes),
    /// A signed 64-bit number.
    Integer(i64),
    /// A binary-safe bytes sequence.
    BulkString(Bytes),
    /// A sequence of frames.
    Array(Vec<Frame>),
    /// Nothingness, sent either as a null bulk string or a null array.
    Null,
}

impl Frame {
    /// Name of the variant, used when reporting type mismatches.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::SimpleString(_) => "simple string",
            Frame::Integer(_) => "integer",
            Frame::BulkString(_) => "bulk string",
            Frame::Array(_) => "array",
            Frame::Null => "nil",
        }
    }

    /// Returns `true` if the frame is nil.
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Null)
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Frame::SimpleString(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Frame::Integer(i) => write!(f, "(integer) {}", i),
            Frame::BulkString(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Frame::Null => write!(f, "(nil)"),
            Frame::Array(items) if items.is_empty() => write!(f, "(empty array)"),
            Frame::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                        write!(f, "{:width$}", "", width = depth * 3)?;
                    }
                    write!(f, "{}) ", i + 1)?;
                    item.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

// Nested arrays are taken apart one level at a time, dropping a deeply nested frame
// must not exhaust the stack.
impl Drop for Frame {
    fn drop(&mut self) {
        let mut items = match self {
            Frame::Array(items) if items.iter().any(|i| matches!(i, Frame::Array(_))) => {
                mem::take(items)
            }
            _ => return,
        };
        while let Some(mut item) = items.pop() {
            if let Frame::Array(inner) = &mut item {
                items.append(inner);
            }
        }
    }
}

/// Renders the frame the same way `redis-cli` shows a reply.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scalars() {
        assert_eq!(Frame::SimpleString("OK".into()).to_string(), "OK");
        assert_eq!(Frame::Integer(-3).to_string(), "(integer) -3");
        assert_eq!(Frame::BulkString("hello".into()).to_string(), "\"hello\"");
        assert_eq!(Frame::Null.to_string(), "(nil)");
        assert_eq!(Frame::Array(vec![]).to_string(), "(empty array)");
    }

    #[test]
    fn display_nested_array() {
        let frame = Frame::Array(vec![
            Frame::BulkString("foo".into()),
            Frame::Array(vec![Frame::Integer(1), Frame::Null]),
        ]);
        assert_eq!(
            frame.to_string(),
            "1) \"foo\"\n2) 1) (integer) 1\n   2) (nil)"
        );
    }

    #[test]
    fn drop_deeply_nested_array() {
        let mut frame = Frame::Integer(1);
        for _ in 0..1_000_000 {
            frame = Frame::Array(vec![frame, Frame::Null]);
        }
        assert_eq!(frame.kind(), "array");
        drop(frame);
    }
}
