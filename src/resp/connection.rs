use std::{fmt, net::SocketAddr};

use bytes::BytesMut;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream},
    net::{TcpStream, ToSocketAddrs},
};
use tracing::{debug, warn};

use super::{decode, encode, Command, Error, Frame, Pipeline, Response};
use crate::{conf::ClientConfig, DEFAULT_BUFFER_SIZE};

// A zero-sized read buffer would make every read look like the end of the stream.
const MIN_BUFFER_SIZE: usize = 64;

/// Sends commands to and reads replies from a RESP server over one transport.
///
/// A connection is either open or closed. It gets closed by [`close`], or after a failure
/// that leaves the byte stream at an unknown position (an I/O error, bytes that don't
/// follow the protocol, or a future that was dropped halfway through writing a request or
/// reading a reply, e.g. by a timeout). Once closed, every operation fails with
/// [`Error::Closed`].
///
/// A connection must not be shared between concurrent units of work. Every method takes
/// `&mut self`, so a request and its reply can never interleave with another request.
///
/// [`close`]: Connection::close
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    // buffers both directions of the transport, `None` once closed
    stream: Option<BufStream<S>>,
    // scratch space that commands are encoded into before being written
    buffer: BytesMut,
    // set while a request or a reply is partially transferred
    in_flight: bool,
}

impl Connection<TcpStream> {
    /// Attempt to connect to the server located at the given address.
    pub async fn connect<A>(addr: A) -> Result<Self, Error>
    where
        A: ToSocketAddrs,
    {
        Self::connect_with_capacity(addr, DEFAULT_BUFFER_SIZE).await
    }

    /// Attempt to connect to the server located at the given address, using buffers of
    /// `buffer_size` bytes for reading and writing.
    pub async fn connect_with_capacity<A>(addr: A, buffer_size: usize) -> Result<Self, Error>
    where
        A: ToSocketAddrs,
    {
        let tcp = TcpStream::connect(addr).await?;
        debug!(peer = ?tcp.peer_addr().ok(), buffer_size, "connected");
        Ok(Self::with_capacity(tcp, buffer_size))
    }

    /// Attempt to connect to the server described by the configuration.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        Self::connect_with_capacity((config.host.as_str(), config.port), config.buffer_size).await
    }

    /// Get the address of the server.
    pub fn peer_addr(&self) -> Result<SocketAddr, Error> {
        let stream = self.stream.as_ref().ok_or(Error::Closed)?;
        Ok(stream.get_ref().peer_addr()?)
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Creates a new connection over the given readable and writable stream.
    pub fn new(stream: S) -> Self {
        Self::with_capacity(stream, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a new connection over the given stream, using buffers of `buffer_size`
    /// bytes for reading and writing.
    pub fn with_capacity(stream: S, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(MIN_BUFFER_SIZE);
        Self {
            stream: Some(BufStream::with_capacity(buffer_size, buffer_size, stream)),
            buffer: BytesMut::new(),
            in_flight: false,
        }
    }

    /// Send the command and wait for its reply.
    ///
    /// This never fails by itself, any failure that occurs while writing the command or
    /// reading the reply is captured in the returned [`Response`].
    pub async fn call<C>(&mut self, command: C) -> Response
    where
        C: Into<Command>,
    {
        let command = command.into();
        if let Err(e) = self.write_command(&command).await {
            return Response::err(e);
        }
        self.read().await
    }

    /// Send the command without waiting for its reply.
    ///
    /// The reply has to be read with [`read`] before anything else is done with the
    /// connection, otherwise replies will be matched with the wrong requests.
    ///
    /// [`read`]: Connection::read
    pub async fn send<C>(&mut self, command: C) -> Result<(), Error>
    where
        C: Into<Command>,
    {
        self.write_command(&command.into()).await
    }

    /// Read the reply of a command that was previously sent.
    pub async fn read(&mut self) -> Response {
        Response::from(self.read_frame().await)
    }

    /// Creates a pipeline for sending several commands before reading their replies.
    pub fn pipeline(&mut self) -> Pipeline<'_, S> {
        Pipeline::new(self)
    }

    /// Close the connection, flushing anything that is still buffered.
    ///
    /// Closing a connection that is already closed does nothing.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.in_flight = false;
        match self.stream.take() {
            Some(mut stream) => {
                debug!("closing connection");
                stream.shutdown().await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Returns `true` if the connection can no longer be used.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none() || self.in_flight
    }

    /// Encode the command, write it and flush the stream.
    pub(crate) async fn write_command(&mut self, command: &Command) -> Result<(), Error> {
        self.begin()?;
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;
        debug!(request = ?command);

        self.buffer.clear();
        encode::encode(command, &mut self.buffer);

        let res = match stream.write_all(&self.buffer).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = res {
            let e = Error::from(e);
            self.abort(&e);
            return Err(e);
        }
        self.in_flight = false;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame, Error> {
        self.begin()?;
        let stream = self.stream.as_mut().ok_or(Error::Closed)?;

        let res = decode::read_frame(stream).await;
        self.in_flight = false;
        match &res {
            // nested arrays can be arbitrarily deep, only their size is logged
            Ok(Frame::Array(items)) => debug!(response = "array", len = items.len()),
            Ok(frame) => debug!(response = ?frame),
            Err(e) if e.is_fatal() => self.abort(e),
            Err(e) => debug!(error = %e),
        }
        res
    }

    /// Mark the start of a transfer. A transfer that was left unfinished by a dropped
    /// future means the position in the stream is unknown, the connection is closed.
    fn begin(&mut self) -> Result<(), Error> {
        if self.in_flight {
            self.abort(&"a previous request or reply was interrupted");
            return Err(Error::Closed);
        }
        if self.stream.is_none() {
            return Err(Error::Closed);
        }
        self.in_flight = true;
        Ok(())
    }

    /// Drop the transport. Used when the stream can no longer be kept aligned.
    pub(crate) fn abort(&mut self, cause: &dyn fmt::Display) {
        self.in_flight = false;
        if self.stream.take().is_some() {
            warn!(cause = %cause, "closing connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, time::Duration};

    use bytes::Bytes;
    use tokio::{
        io::{duplex, AsyncReadExt, DuplexStream},
        time::{sleep, timeout},
    };

    use super::*;
    use crate::resp::{cmd, ProtocolError};

    /// Spawns a fake server that waits for `requests` bytes of request data and then
    /// replies with `replies`. Returns the connection and a handle resolving to the
    /// bytes the server received.
    fn scripted(
        requests: usize,
        replies: &'static [u8],
    ) -> (
        Connection<DuplexStream>,
        tokio::task::JoinHandle<Vec<u8>>,
    ) {
        let (client, mut server) = duplex(4096);
        let handle = tokio::spawn(async move {
            let mut received = vec![0u8; requests];
            server.read_exact(&mut received).await.unwrap();
            server.write_all(replies).await.unwrap();
            // keep the stream open until the client is done
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
            received
        });
        (Connection::new(client), handle)
    }

    #[tokio::test]
    async fn call_round_trip() {
        let request = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n";
        let (mut conn, server) = scripted(request.len(), b"+OK\r\n");

        let res = conn.call(["SET", "k", "v"]).await;
        assert!(res.is_success());
        assert_eq!(res.string().unwrap(), Some("OK".to_string()));

        conn.close().await.unwrap();
        assert_eq!(server.await.unwrap(), request);
    }

    #[tokio::test]
    async fn call_captures_server_error() {
        let request = b"*1\r\n$4\r\nINCR\r\n";
        let (mut conn, _server) = scripted(request.len(), b"-ERR wrong type\r\n+PONG\r\n");

        let res = conn.call(["INCR"]).await;
        assert!(!res.is_success());
        assert_eq!(res.raw().unwrap_err().server_message(), Some("ERR wrong type"));
        // a server error keeps the connection usable
        assert!(!conn.is_closed());
        assert_eq!(conn.read().await.string().unwrap(), Some("PONG".to_string()));
    }

    #[tokio::test]
    async fn unknown_type_marker_closes_connection() {
        let request = b"*1\r\n$4\r\nPING\r\n";
        let (mut conn, _server) = scripted(request.len(), b"!oops\r\n+PONG\r\n");

        let res = conn.call(cmd("PING")).await;
        assert!(matches!(
            res.error(),
            Some(Error::Protocol(ProtocolError::InvalidTypeMarker(b'!')))
        ));
        assert!(conn.is_closed());

        // no attempt is made to find the next value
        assert!(matches!(conn.read().await.error(), Some(Error::Closed)));
        assert!(matches!(conn.call(cmd("PING")).await.error(), Some(Error::Closed)));
    }

    #[tokio::test]
    async fn transport_failure_is_captured() {
        let (client, server) = duplex(64);
        drop(server);
        let mut conn = Connection::new(client);

        let res = conn.call(cmd("PING")).await;
        assert!(matches!(res.error(), Some(Error::Io(_))));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (client, _server) = duplex(64);
        let mut conn = Connection::new(client);

        conn.close().await.unwrap();
        assert!(conn.is_closed());
        conn.close().await.unwrap();
        assert!(matches!(conn.send(cmd("PING")).await, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn send_writes_exact_bytes() {
        let mut stream = Cursor::new(Vec::new());
        let mut conn = Connection::new(&mut stream);

        conn.send(cmd("SET").arg("key").arg(Bytes::from_static(b"\r\n")))
            .await
            .unwrap();
        conn.send(cmd("INCRBY").arg("n").arg(5)).await.unwrap();
        drop(conn);

        assert_eq!(
            stream.get_ref().as_slice(),
            b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$2\r\n\r\n\r\n*3\r\n$6\r\nINCRBY\r\n$1\r\nn\r\n:5\r\n"
        );
    }

    #[tokio::test]
    async fn read_replies_in_order() {
        let stream = Cursor::new(b"+OK\r\n$-1\r\n*-1\r\n:10\r\n".to_vec());
        let mut conn = Connection::with_capacity(stream, 0);

        assert_eq!(conn.read().await.string().unwrap(), Some("OK".to_string()));
        assert!(conn.read().await.is_nil());
        assert!(conn.read().await.is_nil());
        assert_eq!(conn.read().await.integer().unwrap(), Some(10));
    }

    #[tokio::test]
    async fn cancelled_call_closes_connection() {
        let request = b"*1\r\n$4\r\nPING\r\n";
        let (client, mut server) = duplex(4096);
        let server = tokio::spawn(async move {
            let mut received = vec![0u8; request.len()];
            server.read_exact(&mut received).await.unwrap();
            sleep(Duration::from_millis(200)).await;
            // the reply to the first request arrives after the caller gave up on it
            let _ = server.write_all(b"+REPLY-TO-FIRST\r\n+REPLY-TO-SECOND\r\n").await;
            let mut rest = Vec::new();
            let _ = server.read_to_end(&mut rest).await;
        });
        let mut conn = Connection::new(client);

        let res = timeout(Duration::from_millis(50), conn.call(cmd("PING"))).await;
        assert!(res.is_err());
        assert!(conn.is_closed());

        let res = conn.call(cmd("PING")).await;
        assert!(matches!(res.error(), Some(Error::Closed)));
        assert!(conn.stream.is_none());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_read_closes_connection() {
        let (client, _server) = duplex(64);
        let mut conn = Connection::new(client);

        conn.send(cmd("PING")).await.unwrap();
        assert!(!conn.is_closed());
        assert!(timeout(Duration::from_millis(20), conn.read()).await.is_err());
        assert!(conn.is_closed());
        assert!(matches!(conn.read().await.error(), Some(Error::Closed)));
    }
}
