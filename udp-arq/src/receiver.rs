//! Receive side of a transfer.
//!
//! [`Receiver`] decides, for each inbound DATA packet, what to deliver and
//! which ACK to send back.  [`receive_file`] wraps it in a socket loop that
//! writes delivered bytes out and answers the sender's EOT with its own.
//!
//! # Go-Back-N
//!
//! - Only the next expected packet is accepted; it is delivered and ACKed.
//! - A duplicate of an already delivered packet is re-ACKed with its own
//!   sequence number.  A GBN sender only advances on an ACK for its exact
//!   base, so after a lost ACK its whole-window retransmission walks the base
//!   forward again one ACK at a time.
//! - A packet from beyond the expected one is discarded and the last in-order
//!   sequence number is ACKed (when there is one).
//!
//! # Selective-Repeat
//!
//! - Packets in `[expected, expected + window)` are buffered and ACKed
//!   individually; the consecutive prefix is delivered.
//! - Packets in `[expected - window, expected)` were already delivered and
//!   are re-ACKed.
//! - Anything else is ignored.

use std::collections::BTreeMap;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::validate_window;
use crate::eot;
use crate::error::ArqError;
use crate::packet::{Packet, PacketType};
use crate::socket::{Socket, SocketError};
use crate::transfer::Protocol;

/// What to do with one inbound DATA packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiveAction {
    /// ACK to send back, if any.
    pub ack: Option<u32>,
    /// In-order bytes ready for the application.
    pub deliver: Vec<u8>,
}

#[derive(Debug)]
pub struct Receiver {
    protocol: Protocol,
    window_size: u32,
    /// Next in-order sequence number (`RCV.NXT`).
    expected: u32,
    /// Out-of-order payloads (Selective-Repeat only).
    buffered: BTreeMap<u32, Vec<u8>>,
}

impl Receiver {
    pub fn new(protocol: Protocol, window_size: u32) -> Self {
        Self {
            protocol,
            window_size,
            expected: 1,
            buffered: BTreeMap::new(),
        }
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    pub fn on_data(&mut self, seq: u32, payload: &[u8]) -> ReceiveAction {
        match self.protocol {
            Protocol::GoBackN => self.on_data_gbn(seq, payload),
            Protocol::SelectiveRepeat => self.on_data_sr(seq, payload),
        }
    }

    fn on_data_gbn(&mut self, seq: u32, payload: &[u8]) -> ReceiveAction {
        if seq == self.expected {
            self.expected += 1;
            ReceiveAction {
                ack: Some(seq),
                deliver: payload.to_vec(),
            }
        } else if seq < self.expected && seq >= 1 {
            ReceiveAction {
                ack: Some(seq),
                deliver: Vec::new(),
            }
        } else {
            let last = self.expected - 1;
            ReceiveAction {
                ack: (last >= 1).then_some(last),
                deliver: Vec::new(),
            }
        }
    }

    fn on_data_sr(&mut self, seq: u32, payload: &[u8]) -> ReceiveAction {
        let upper = self.expected.saturating_add(self.window_size);
        let lower = self.expected.saturating_sub(self.window_size).max(1);

        if (self.expected..upper).contains(&seq) {
            self.buffered.entry(seq).or_insert_with(|| payload.to_vec());
            let mut deliver = Vec::new();
            while let Some(chunk) = self.buffered.remove(&self.expected) {
                deliver.extend(chunk);
                self.expected += 1;
            }
            ReceiveAction {
                ack: Some(seq),
                deliver,
            }
        } else if (lower..self.expected).contains(&seq) {
            ReceiveAction {
                ack: Some(seq),
                deliver: Vec::new(),
            }
        } else {
            ReceiveAction::default()
        }
    }
}

/// Receive one file on `socket`, writing delivered bytes to `output`.
///
/// Returns the number of bytes written once the sender's EOT has been
/// answered.
pub async fn receive_file<W>(
    socket: &Socket,
    protocol: Protocol,
    window_size: u32,
    output: &mut W,
) -> Result<u64, ArqError>
where
    W: AsyncWrite + Unpin,
{
    validate_window(window_size)?;
    let mut receiver = Receiver::new(protocol, window_size);
    let mut written = 0u64;

    loop {
        let (pkt, from) = match socket.recv_from().await {
            Ok(v) => v,
            Err(SocketError::Packet(e)) => {
                log::debug!("[recv] dropping fragment: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match pkt.ptype {
            PacketType::Data => {
                let action = receiver.on_data(pkt.seq, &pkt.payload);
                if !action.deliver.is_empty() {
                    output.write_all(&action.deliver).await?;
                    written += action.deliver.len() as u64;
                }
                if let Some(ack) = action.ack {
                    socket.send_to(&Packet::ack(ack), from).await?;
                }
            }
            PacketType::Eot => {
                output.flush().await?;
                eot::send_eot(socket, from).await?;
                log::info!("received {written} byte(s) in {} packet(s)", receiver.expected() - 1);
                return Ok(written);
            }
            PacketType::Ack | PacketType::Unknown(_) => {
                log::debug!("[recv] ignoring {} seq={}", pkt.ptype.tag(), pkt.seq);
            }
        }
    }
}
