//! Serialization of commands into RESP arrays.
//!
//! Each argument becomes one element of the array:
//! - text and bytes are sent as bulk strings, `$<len>\r\n<bytes>\r\n`
//! - integers are sent as `:<value>\r\n`
//! - nested arguments are sent as arrays, `*<count>\r\n<elements>`
//! - null is sent as the bulk string `null`, which is what servers that were used with
//!   older clients of this protocol expect

use bytes::{BufMut, BytesMut};

use super::{Arg, Command};

const CRLF: &[u8] = b"\r\n";

/// Append the RESP encoding of the command to the buffer.
pub fn encode(command: &Command, buf: &mut BytesMut) {
    write_array(command.args(), buf);
}

/// Append the RESP encoding of a single argument to the buffer.
pub fn encode_arg(arg: &Arg, buf: &mut BytesMut) {
    match arg {
        Arg::Null => write_bulk_string(b"null", buf),
        Arg::Text(s) => write_bulk_string(s.as_bytes(), buf),
        Arg::Bytes(b) => write_bulk_string(b, buf),
        Arg::Integer(i) => write_integer(*i, buf),
        Arg::Nested(args) => write_array(args, buf),
    }
}

fn write_array(args: &[Arg], buf: &mut BytesMut) {
    buf.put_u8(b'*');
    write_decimal(args.len() as i64, buf);
    buf.put_slice(CRLF);
    for arg in args {
        encode_arg(arg, buf);
    }
}

fn write_bulk_string(bytes: &[u8], buf: &mut BytesMut) {
    buf.reserve(bytes.len() + 16);
    buf.put_u8(b'$');
    write_decimal(bytes.len() as i64, buf);
    buf.put_slice(CRLF);
    buf.put_slice(bytes);
    buf.put_slice(CRLF);
}

fn write_integer(value: i64, buf: &mut BytesMut) {
    buf.put_u8(b':');
    write_decimal(value, buf);
    buf.put_slice(CRLF);
}

fn write_decimal(value: i64, buf: &mut BytesMut) {
    buf.put_slice(value.to_string().as_bytes());
}
