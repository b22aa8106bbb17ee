//! A minimal client for the Redis serialization protocol (RESP).
//!
//! Commands are encoded as RESP arrays and written over a single connection, responses
//! are decoded one value at a time. Several commands can be pipelined, i.e. written
//! before any of their responses is read, since the server always replies in the order
//! that requests were sent.
//!
//! ```no_run
//! use redline::{cmd, Connection};
//!
//! # async fn run() -> Result<(), redline::Error> {
//! let mut conn = Connection::connect("127.0.0.1:6379").await?;
//! let res = conn.call(cmd("SET").arg("key").arg("value")).await;
//! assert_eq!(res.string()?, Some("OK".to_string()));
//!
//! let mut pipeline = conn.pipeline();
//! pipeline.call(["INCR", "counter"]).await?;
//! pipeline.call(["GET", "key"]).await?;
//! let responses = pipeline.read().await;
//! assert_eq!(responses.len(), 2);
//! # Ok(())
//! # }
//! ```

#![deny(rust_2018_idioms)]
#![warn(missing_docs)]

pub mod conf;
pub mod resp;
pub mod telemetry;

/// Default port address of the service
pub const DEFAULT_PORT: u16 = 6379;

/// Default capacity of the read and write buffers of a connection
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 16;

pub use resp::{cmd, Arg, Client, Command, Connection, Error, Frame, Pipeline, Response};
