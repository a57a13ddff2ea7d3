//! End-of-transmission handshake.
//!
//! Once every DATA packet is acknowledged the sender transmits one EOT and then
//! treats every incoming packet as noise until the peer's own EOT shows up.
//! Stray ACKs, late DATA echoes, unknown types and malformed fragments are
//! tolerated here, never reported as errors.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ArqError;
use crate::packet::{Packet, PacketType};
use crate::socket::{Socket, SocketError};

/// Transmit the EOT sentinel to `peer`.
pub async fn send_eot(socket: &Socket, peer: SocketAddr) -> Result<(), ArqError> {
    socket.send_to(&Packet::eot(), peer).await?;
    log::debug!("[eot] → EOT");
    Ok(())
}

/// Wait for the peer's EOT.
///
/// With `bound = None` this blocks until an EOT arrives and always returns
/// `Ok(true)`.  With `Some(d)` at most one datagram is awaited for up to `d`;
/// the result says whether it was the EOT.
pub async fn await_peer_eot(socket: &Socket, bound: Option<Duration>) -> Result<bool, ArqError> {
    loop {
        let received = match bound {
            Some(wait) => socket.recv_timeout(wait).await,
            None => socket.recv_from().await.map(Some),
        };

        match received {
            Ok(Some((pkt, _))) if is_eot(&pkt) => {
                log::debug!("[eot] ← EOT; handshake complete");
                return Ok(true);
            }
            Ok(Some((pkt, _))) => {
                log::debug!("[eot] ignoring {} seq={} while draining", pkt.ptype.tag(), pkt.seq);
            }
            Ok(None) => {}
            Err(SocketError::Packet(e)) => log::debug!("[eot] dropping fragment: {e}"),
            Err(e) => return Err(e.into()),
        }

        if bound.is_some() {
            return Ok(false);
        }
    }
}

pub fn is_eot(pkt: &Packet) -> bool {
    pkt.ptype == PacketType::Eot
}
