//! High-level entry points: pick a protocol, find the peer, send a file.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::config::{ArqConfig, RendezvousConfig};
use crate::error::ArqError;
use crate::gbn::GbnEngine;
use crate::rendezvous;
use crate::selective_repeat::SrEngine;
use crate::socket::Socket;

/// Which sliding-window algorithm drives the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Protocol {
    /// Go-Back-N: cumulative ACKs, one timer, whole-window retransmission.
    #[value(name = "gbn")]
    GoBackN,
    /// Selective-Repeat: per-packet ACKs and timers.
    #[value(name = "sr")]
    SelectiveRepeat,
}

/// What a completed transfer did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Distinct DATA packets sent (retransmissions excluded).
    pub data_packets: u32,
    /// Sum of payload bytes over distinct DATA packets.
    pub payload_bytes: u64,
    /// DATA retransmissions across the whole transfer.
    pub retransmissions: u64,
    /// Window base when the transfer finished; `data_packets + 1`.
    pub final_base: u32,
}

/// Run `protocol` over an already-bound socket.
pub async fn send_stream<R>(
    protocol: Protocol,
    socket: Arc<Socket>,
    peer: SocketAddr,
    input: R,
    config: &ArqConfig,
) -> Result<TransferSummary, ArqError>
where
    R: AsyncRead + Unpin,
{
    config.validate()?;
    match protocol {
        Protocol::GoBackN => GbnEngine::new(socket, peer, input, config.clone()).run().await,
        Protocol::SelectiveRepeat => SrEngine::new(socket, peer, input, config.clone()).run().await,
    }
}

/// Resolve the peer, bind an ephemeral socket and send the file at `path`.
pub async fn send_file(
    protocol: Protocol,
    path: &Path,
    rendezvous: &RendezvousConfig,
    config: &ArqConfig,
) -> Result<TransferSummary, ArqError> {
    config.validate()?;
    let peer = rendezvous::resolve_peer(rendezvous).await?;
    let bind: SocketAddr = if peer.is_ipv6() {
        (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
    } else {
        (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
    };
    let socket = Arc::new(Socket::bind(bind).await?);
    let file = tokio::fs::File::open(path).await?;

    log::info!(
        "sending {} to {peer} with {protocol:?} (window={}, max_payload={}, timeout={:?})",
        path.display(),
        config.window_size,
        config.max_payload,
        config.timeout
    );
    send_stream(protocol, socket, peer, file, config).await
}
