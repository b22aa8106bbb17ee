//! This module contains the implementation for Redis serialization protocol (RESP),
//! along with a connection that speaks it and a pipeline for batching requests.

mod client;
mod command;
mod connection;
pub mod decode;
pub mod encode;
mod error;
mod frame;
mod pipeline;
mod response;

pub use client::Client;
pub use command::{cmd, Arg, Command};
pub use connection::Connection;
pub use error::{Error, ProtocolError};
pub use frame::Frame;
pub use pipeline::Pipeline;
pub use response::Response;
