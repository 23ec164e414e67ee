use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is full")]
    Full,
    #[error("connection {0} does not hold a slot")]
    UnknownConnection(u32),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode packet for {addr}: {source}")]
    Encode {
        addr: SocketAddr,
        #[source]
        source: bincode::Error,
    },
}
