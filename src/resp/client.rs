use std::iter;

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
};

use super::{cmd, Arg, Command, Connection, Error, Frame, Pipeline, Response};
use crate::conf::ClientConfig;

/// Provide typed methods for a small set of Redis commands on top of a [`Connection`].
///
/// Unlike [`Connection::call`], the methods of `Client` return errors sent by the server
/// as `Err(Error::Server(..))` and replies of an unexpected shape as
/// `Err(Error::TypeMismatch { .. })`.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    conn: Connection<S>,
}

impl Client<TcpStream> {
    /// Attempt to connect to the Redis server located at the given address.
    pub async fn connect<A>(addr: A) -> Result<Self, Error>
    where
        A: ToSocketAddrs,
    {
        let conn = Connection::connect(addr).await?;
        Ok(Self { conn })
    }

    /// Attempt to connect to the Redis server described by the configuration.
    pub async fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let conn = Connection::from_config(config).await?;
        Ok(Self { conn })
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established connection.
    pub fn new(conn: Connection<S>) -> Self {
        Self { conn }
    }

    /// Get the underlying connection.
    pub fn connection(&mut self) -> &mut Connection<S> {
        &mut self.conn
    }

    /// Consumes the client, returning the underlying connection.
    pub fn into_inner(self) -> Connection<S> {
        self.conn
    }

    /// Send an arbitrary command, see [`Connection::call`].
    pub async fn call<C>(&mut self, command: C) -> Response
    where
        C: Into<Command>,
    {
        self.conn.call(command).await
    }

    /// Creates a pipeline, see [`Connection::pipeline`].
    pub fn pipeline(&mut self) -> Pipeline<'_, S> {
        self.conn.pipeline()
    }

    /// Close the underlying connection.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.conn.close().await
    }

    /// Check that the server is alive. Returns the server's reply, usually `PONG`.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&mut self) -> Result<String, Error> {
        let res = self.conn.call(cmd("PING")).await;
        res.string()?.ok_or_else(|| nil("string"))
    }

    /// Get the value of the key.
    ///
    /// Returns `None` if the key does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&mut self, key: &str) -> Result<Option<Bytes>, Error> {
        let res = self.conn.call(cmd("GET").arg(key)).await;
        Ok(res.bytes()?.cloned())
    }

    /// Set the value of the key, overwritting the value that is currently held by
    /// the key, regardless of its type.
    #[tracing::instrument(skip(self, value))]
    pub async fn set<V>(&mut self, key: &str, value: V) -> Result<(), Error>
    where
        V: Into<Arg>,
    {
        let res = self.conn.call(cmd("SET").arg(key).arg(value)).await;
        match res.raw()? {
            Frame::SimpleString(s) if s.as_ref() == b"OK" => Ok(()),
            frame => Err(Error::TypeMismatch {
                expected: "OK",
                actual: frame.kind(),
            }),
        }
    }

    /// Removes the specified keys, ignoring non-existed keys.
    ///
    /// Returns the number of keys that were removed.
    #[tracing::instrument(skip(self))]
    pub async fn del(&mut self, keys: &[&str]) -> Result<i64, Error> {
        let command: Command = iter::once("DEL").chain(keys.iter().copied()).collect();
        let res = self.conn.call(command).await;
        res.integer()?.ok_or_else(|| nil("integer"))
    }

    /// Returns the number of the specified keys that exist.
    #[tracing::instrument(skip(self))]
    pub async fn exists(&mut self, keys: &[&str]) -> Result<i64, Error> {
        let command: Command = iter::once("EXISTS").chain(keys.iter().copied()).collect();
        let res = self.conn.call(command).await;
        res.integer()?.ok_or_else(|| nil("integer"))
    }

    /// Increments the number stored at key by one.
    ///
    /// Returns the value of the key after the increment.
    #[tracing::instrument(skip(self))]
    pub async fn incr(&mut self, key: &str) -> Result<i64, Error> {
        let res = self.conn.call(cmd("INCR").arg(key)).await;
        res.integer()?.ok_or_else(|| nil("integer"))
    }
}

impl<S> From<Connection<S>> for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn from(conn: Connection<S>) -> Self {
        Self::new(conn)
    }
}

fn nil(expected: &'static str) -> Error {
    Error::TypeMismatch {
        expected,
        actual: "nil",
    }
}
