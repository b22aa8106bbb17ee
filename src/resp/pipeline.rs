use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use super::{Command, Connection, Error, Response};

/// A batch of commands whose replies are read together.
///
/// Commands are written and flushed right away, replies are only read by [`read`], in
/// the same order as the commands were sent. The pipeline holds the connection
/// exclusively until it is dropped.
///
/// A pipeline that is dropped before all of its replies were read closes the connection,
/// since the remaining replies would otherwise be taken for replies to later requests.
///
/// [`read`]: Pipeline::read
#[derive(Debug)]
pub struct Pipeline<'a, S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    conn: &'a mut Connection<S>,
    pending: usize,
}

impl<'a, S> Pipeline<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(conn: &'a mut Connection<S>) -> Self {
        Self { conn, pending: 0 }
    }

    /// Send the command without reading its reply.
    ///
    /// Unlike [`Connection::call`], a failure to write is returned right away as there is
    /// no reply that could carry it.
    pub async fn call<C>(&mut self, command: C) -> Result<&mut Self, Error>
    where
        C: Into<Command>,
    {
        self.conn.write_command(&command.into()).await?;
        self.pending += 1;
        Ok(self)
    }

    /// Read the replies of all commands sent since the last read, in order.
    pub async fn read(&mut self) -> Vec<Response> {
        let mut responses = Vec::with_capacity(self.pending);
        while self.pending > 0 {
            responses.push(self.conn.read().await);
            self.pending -= 1;
        }
        responses
    }

    /// Number of replies that have not been read yet.
    pub fn pending(&self) -> usize {
        self.pending
    }
}

impl<S> Drop for Pipeline<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn drop(&mut self) {
        if self.pending > 0 {
            let pending = self.pending;
            self.conn
                .abort(&format_args!("pipeline dropped with {} unread replies", pending));
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::resp::cmd;

    #[tokio::test]
    async fn replies_are_returned_in_order() {
        let (client, mut server) = duplex(4096);
        let mut conn = Connection::new(client);

        let server = tokio::spawn(async move {
            // GET a, GET b, GET c
            let mut received = vec![0u8; 3 * 20];
            server.read_exact(&mut received).await.unwrap();
            server
                .write_all(b"$1\r\nA\r\n$-1\r\n-ERR C\r\n")
                .await
                .unwrap();
            server
        });

        let mut pipeline = conn.pipeline();
        pipeline
            .call(["GET", "a"])
            .await
            .unwrap()
            .call(["GET", "b"])
            .await
            .unwrap();
        pipeline.call(cmd("GET").arg("c")).await.unwrap();
        assert_eq!(pipeline.pending(), 3);

        let responses = pipeline.read().await;
        assert_eq!(pipeline.pending(), 0);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].string().unwrap(), Some("A".to_string()));
        assert!(responses[1].is_nil());
        assert_eq!(
            responses[2].error().and_then(Error::server_message),
            Some("ERR C")
        );
        drop(pipeline);

        let _server = server.await.unwrap();
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn read_without_calls_is_empty() {
        let (client, _server) = duplex(64);
        let mut conn = Connection::new(client);

        let mut pipeline = conn.pipeline();
        assert!(pipeline.read().await.is_empty());
        drop(pipeline);
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn write_failure_is_returned_immediately() {
        let (client, server) = duplex(64);
        drop(server);
        let mut conn = Connection::new(client);

        let mut pipeline = conn.pipeline();
        assert!(matches!(
            pipeline.call(cmd("PING")).await,
            Err(Error::Io(_))
        ));
        assert_eq!(pipeline.pending(), 0);
    }

    #[tokio::test]
    async fn dropping_undrained_pipeline_closes_connection() {
        let (client, _server) = duplex(4096);
        let mut conn = Connection::new(client);

        let mut pipeline = conn.pipeline();
        pipeline.call(cmd("PING")).await.unwrap();
        drop(pipeline);

        assert!(conn.is_closed());
    }
}
