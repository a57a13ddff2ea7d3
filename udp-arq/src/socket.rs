//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`crate::packet::Packet`] instead of raw bytes and emits one
//! [`crate::event::PacketEvent`] per datagram sent or received.  All protocol
//! logic lives elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::event::{self, Direction, PacketEvent};
use crate::packet::{Packet, PacketError};

/// Maximum UDP payload size (theoretical limit; in practice kept much smaller).
const MAX_DATAGRAM: usize = 65_535;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket send error: {0}")]
    Send(#[source] io::Error),
    #[error("socket receive error: {0}")]
    Recv(#[source] io::Error),
    /// The received datagram could not be decoded as a packet.
    #[error("packet decode error: {0}")]
    Packet(#[from] PacketError),
}

// ---------------------------------------------------------------------------
// Socket
// ---------------------------------------------------------------------------

/// An async, packet-oriented UDP socket.
///
/// All methods are `&self` so the socket can be shared across tasks.  When
/// several tasks wait in [`recv_from`](Self::recv_from) at once, each datagram
/// is handed to exactly one of them.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Encode `packet` and send it as a single UDP datagram to `dest`.
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        self.send_raw(&packet.encode(), packet, dest).await
    }

    /// Send bytes that were encoded earlier (a retransmission).
    ///
    /// `packet` is only used for the event record.
    pub async fn send_raw(
        &self,
        bytes: &[u8],
        packet: &Packet,
        dest: SocketAddr,
    ) -> Result<(), SocketError> {
        self.inner
            .send_to(bytes, dest)
            .await
            .map_err(SocketError::Send)?;
        event::emit(PacketEvent::new(Direction::Send, packet));
        Ok(())
    }

    /// Receive the next datagram and decode it into a [`Packet`].
    ///
    /// Returns `(packet, sender_address)`.  Datagrams that fail to decode are
    /// returned as `Err(SocketError::Packet)`; the caller decides whether to
    /// ignore them.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self
            .inner
            .recv_from(&mut buf)
            .await
            .map_err(SocketError::Recv)?;
        let packet = Packet::decode(&buf[..n])?;
        event::emit(PacketEvent::new(Direction::Recv, &packet));
        Ok((packet, addr))
    }

    /// [`recv_from`](Self::recv_from) bounded by `wait`.
    ///
    /// `Ok(None)` means the wait expired; a zero `wait` polls once.
    pub async fn recv_timeout(
        &self,
        wait: Duration,
    ) -> Result<Option<(Packet, SocketAddr)>, SocketError> {
        match tokio::time::timeout(wait, self.recv_from()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}
