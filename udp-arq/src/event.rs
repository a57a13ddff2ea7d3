//! Per-packet diagnostic events.
//!
//! Every datagram that crosses the socket produces one [`PacketEvent`].  The
//! socket layer hands it to [`emit`], which writes it through the `log` facade
//! on the [`PACKET_TARGET`] target.  Nothing in the protocol engines depends on
//! where (or whether) these records end up.

use std::fmt;

use crate::packet::{Packet, PacketType};

/// `log` target used for packet events, so they can be filtered separately
/// (`RUST_LOG=udp_arq::packet=info`).
pub const PACKET_TARGET: &str = "udp_arq::packet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => f.write_str("SEND"),
            Direction::Recv => f.write_str("RECV"),
        }
    }
}

/// `(direction, type, length, seq)` for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketEvent {
    pub direction: Direction,
    pub ptype: PacketType,
    pub length: u32,
    pub seq: u32,
}

impl PacketEvent {
    pub fn new(direction: Direction, packet: &Packet) -> Self {
        Self {
            direction,
            ptype: packet.ptype,
            length: packet.length,
            seq: packet.seq,
        }
    }
}

impl fmt::Display for PacketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PKT {} {} {} {}",
            self.direction,
            self.ptype.tag(),
            self.length,
            self.seq
        )
    }
}

pub fn emit(event: PacketEvent) {
    log::info!(target: PACKET_TARGET, "{event}");
}
