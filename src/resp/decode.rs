//! Parsing of RESP values from a buffered byte stream.
//!
//! The decoder reads through an [`AsyncBufRead`] and never consumes more bytes than the
//! value being parsed is made of. Whatever follows in the stream, e.g. the response to the
//! next pipelined request, is left untouched for the next call.

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::{Error, Frame, ProtocolError};

/// Max size of a bulk string, as allowed by Redis
pub const MAX_BULK_STRING_LENGTH: usize = 512 * (1 << 20); // 512MB

/// Max size of a line, including its "\r\n" terminator
pub const MAX_LINE_LENGTH: usize = 64 * 1024; // 64KB

// Bulk string buffers start at most this large and grow as the content arrives
const INITIAL_BULK_CAPACITY: usize = 8 * 1024;

/// Read exactly one complete value from the reader.
///
/// The future resolves once the value, including all nested elements, has been read.
/// A `-` reply is returned as [`Error::Server`]; it is the only error after which the
/// stream is still positioned at the start of the next value.
///
/// Arrays may nest to any depth, they are assembled on the heap rather than by recursion.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    // Arrays whose elements are still being read, the innermost one is last
    let mut open: Vec<PartialArray> = Vec::new();

    'read: loop {
        let mut value = match read_value(reader).await {
            Ok(Value::Frame(frame)) => Ok(frame),
            Ok(Value::ArrayHeader(0)) => Ok(Frame::Array(Vec::new())),
            Ok(Value::ArrayHeader(len)) => {
                open.push(PartialArray::new(len));
                continue;
            }
            Err(Error::Server(msg)) => Err(msg),
            Err(e) => return Err(e),
        };

        // Hand the value to its enclosing array, closing every array that becomes full
        while let Some(mut array) = open.pop() {
            array.push(value);
            if array.remaining > 0 {
                open.push(array);
                continue 'read;
            }
            value = array.finish();
        }
        return value.map_err(Error::Server);
    }
}

enum Value {
    Frame(Frame),
    // the elements follow as separate values
    ArrayHeader(usize),
}

struct PartialArray {
    remaining: usize,
    items: Vec<Frame>,
    // only the first error element is reported
    server_error: Option<String>,
}

impl PartialArray {
    fn new(len: usize) -> Self {
        Self {
            remaining: len,
            // Don't trust the prefix for the allocation, the elements may never arrive
            items: Vec::with_capacity(len.min(1024)),
            server_error: None,
        }
    }

    fn push(&mut self, item: Result<Frame, String>) {
        self.remaining -= 1;
        match item {
            Ok(frame) => self.items.push(frame),
            // Keep reading so that the whole array is consumed
            Err(msg) => {
                self.server_error.get_or_insert(msg);
            }
        }
    }

    fn finish(self) -> Result<Frame, String> {
        match self.server_error {
            Some(msg) => Err(msg),
            None => Ok(Frame::Array(self.items)),
        }
    }
}

async fn read_value<R>(reader: &mut R) -> Result<Value, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    match reader.read_u8().await? {
        b'+' => {
            let line = read_line(reader).await?;
            Ok(Value::Frame(Frame::SimpleString(line.into())))
        }
        b'-' => {
            let line = read_line(reader).await?;
            Err(Error::Server(String::from_utf8_lossy(&line).into_owned()))
        }
        b':' => {
            let i = read_integer(reader).await?;
            Ok(Value::Frame(Frame::Integer(i)))
        }
        b'$' => read_bulk_string(reader).await.map(Value::Frame),
        // *<number-of-elements>\r\n<element-1>...<element-n>
        b'*' => match read_length(reader).await? {
            Some(len) => Ok(Value::ArrayHeader(len)),
            None => Ok(Value::Frame(Frame::Null)),
        },
        b => Err(ProtocolError::InvalidTypeMarker(b).into()),
    }
}

// $<length>\r\n<data>\r\n
async fn read_bulk_string<R>(reader: &mut R) -> Result<Frame, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    let len = match read_length(reader).await? {
        Some(len) => len,
        None => return Ok(Frame::Null),
    };
    if len > MAX_BULK_STRING_LENGTH {
        return Err(ProtocolError::TooLarge(len).into());
    }

    // The content is read by length, any "\r\n" inside it is data. The buffer only grows
    // with the bytes that actually arrive.
    let mut data = Vec::with_capacity(len.min(INITIAL_BULK_CAPACITY));
    let n = (&mut *reader).take(len as u64).read_to_end(&mut data).await?;
    if n < len {
        return Err(unexpected_eof("connection closed in the middle of a bulk string"));
    }

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
    if &crlf != b"\r\n" {
        return Err(ProtocolError::MissingCrlf.into());
    }
    Ok(Frame::BulkString(Bytes::from(data)))
}

/// Read a length prefix. Returns `None` for -1, which is how nil is sent.
async fn read_length<R>(reader: &mut R) -> Result<Option<usize>, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    match read_integer(reader).await? {
        -1 => Ok(None),
        n if n < 0 => Err(ProtocolError::InvalidLength(n).into()),
        n => usize::try_from(n)
            .map(Some)
            .map_err(|_| ProtocolError::InvalidLength(n).into()),
    }
}

async fn read_integer<R>(reader: &mut R) -> Result<i64, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    let line = read_line(reader).await?;
    std::str::from_utf8(&line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ProtocolError::NotInteger(String::from_utf8_lossy(&line).into_owned()).into())
}

/// Read until "\r\n", which is consumed but not returned. A lone '\r' is not allowed.
async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, Error>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut line = Vec::new();
    (&mut *reader)
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', &mut line)
        .await?;

    if line.last() != Some(&b'\n') {
        if line.len() == MAX_LINE_LENGTH {
            return Err(ProtocolError::LineTooLong(MAX_LINE_LENGTH).into());
        }
        // The stream ended before the terminator
        return Err(unexpected_eof("connection closed in the middle of a line"));
    }
    if !line.ends_with(b"\r\n") || line[..line.len() - 2].contains(&b'\r') {
        return Err(ProtocolError::MissingCrlf.into());
    }

    line.truncate(line.len() - 2);
    Ok(line)
}

fn unexpected_eof(msg: &'static str) -> Error {
    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, msg).into()
}
