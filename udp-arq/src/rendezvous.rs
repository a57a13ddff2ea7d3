//! Peer address discovery through a shared file.
//!
//! The receiving side (or a channel emulator in front of it) writes
//! `"<host> <port>"` into a well-known file.  The sender polls that file a
//! bounded number of times before giving up.

use std::io;
use std::net::SocketAddr;
use std::path::Path;

use tokio::net::lookup_host;

use crate::config::RendezvousConfig;
use crate::error::ArqError;

/// Poll `config.path` until it names a reachable `host port` pair.
///
/// Every failed attempt is followed by one `config.interval` pause, so the
/// default configuration gives up after a full minute.
pub async fn resolve_peer(config: &RendezvousConfig) -> Result<SocketAddr, ArqError> {
    for attempt in 1..=config.attempts {
        match read_peer(&config.path).await {
            Ok(addr) => {
                log::info!("peer resolved to {addr} from {}", config.path.display());
                return Ok(addr);
            }
            Err(e) => {
                log::debug!(
                    "rendezvous attempt {attempt}/{} on {} failed: {e}",
                    config.attempts,
                    config.path.display()
                );
                tokio::time::sleep(config.interval).await;
            }
        }
    }

    Err(ArqError::PeerUnavailable {
        path: config.path.clone(),
        attempts: config.attempts,
    })
}

/// Write `addr` as `"<host> <port>\n"` so a peer can find it.
pub async fn publish_peer(path: &Path, addr: SocketAddr) -> io::Result<()> {
    tokio::fs::write(path, format!("{} {}\n", addr.ip(), addr.port())).await
}

async fn read_peer(path: &Path) -> io::Result<SocketAddr> {
    let contents = tokio::fs::read_to_string(path).await?;
    let (host, port) = parse_line(&contents)?;
    let addr = lookup_host((host, port)).await?.next();
    addr.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{host} did not resolve")))
}

fn parse_line(contents: &str) -> io::Result<(&str, u16)> {
    let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_string());

    let line = contents.lines().next().ok_or_else(|| invalid("empty file"))?;
    let mut fields = line.split_whitespace();
    let host = fields.next().ok_or_else(|| invalid("missing host"))?;
    let port = fields
        .next()
        .ok_or_else(|| invalid("missing port"))?
        .parse::<u16>()
        .map_err(|_| invalid("port is not a number"))?;
    Ok((host, port))
}
