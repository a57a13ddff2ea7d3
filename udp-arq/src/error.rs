//! Error types surfaced by the transfer engines.
//!
//! Packet loss is never an error here: timeouts drive retransmission and
//! duplicate acknowledgments are dropped silently.  Only resource-level
//! failures reach the caller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::packet::PacketError;
use crate::socket::SocketError;

#[derive(Debug, Error)]
pub enum ArqError {
    /// A window, payload or timeout setting the engines cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rendezvous file never produced a usable peer address.
    #[error("could not resolve peer from {path:?} after {attempts} attempt(s)")]
    PeerUnavailable { path: PathBuf, attempts: u32 },

    /// Writing a datagram to the socket failed.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Reading from the socket failed for a reason other than a timeout.
    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    #[error(transparent)]
    Malformed(#[from] PacketError),

    /// Reading the input or writing the output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configured retry ceiling was hit while `seq` was still unacknowledged.
    #[error("packet {seq} not acknowledged within the retry limit")]
    RetriesExhausted { seq: u32 },

    /// A selective-repeat worker task panicked or was cancelled.
    #[error("reliability worker failed: {0}")]
    Worker(String),
}

impl From<SocketError> for ArqError {
    fn from(e: SocketError) -> Self {
        match e {
            SocketError::Send(e) => ArqError::Send(e),
            SocketError::Recv(e) => ArqError::Recv(e),
            SocketError::Packet(e) => ArqError::Malformed(e),
        }
    }
}
