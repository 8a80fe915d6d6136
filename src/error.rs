//! Error types for mailroom
//!
//! Only call-aborting faults are errors. A single UID that the server
//! refuses to copy or move is recorded in an
//! [`OperationResult`](crate::OperationResult) instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The server could not be reached or closed the connection
    /// before a session was established.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("TLS error: {0}")]
    Tls(String),

    /// A command the whole call depends on (LOGIN, SELECT, LIST,
    /// SEARCH, FETCH) was rejected or failed at the transport level.
    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Outgoing message was rejected while building or sending.
    #[error("Send error: {0}")]
    Send(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
