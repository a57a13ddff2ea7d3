//! Go-Back-N sending engine.
//!
//! # Event loop
//!
//! One task owns everything: the window ([`GbnSender`]), the retransmission
//! timer ([`RetransmitTimer`]) and the input.  Each iteration performs, in
//! order:
//!
//! 1. a bounded wait for one incoming packet.  The wait is a non-blocking
//!    poll while the window has room and input remains; otherwise it lasts
//!    until the timer deadline (or one interval when the timer is disarmed);
//! 2. dispatch of that packet: an ACK for `send_base` slides the window and
//!    restarts the timer, any other ACK is a duplicate, an EOT ends the
//!    transfer;
//! 3. timer check: on expiry, every in-flight packet is retransmitted in
//!    ascending order and the timer restarts;
//! 4. admission of one new chunk if the window has room.
//!
//! When the input is exhausted and the window is empty, the timer is
//! cancelled, one EOT is sent and the engine drains until the peer's EOT.
//!
//! ```ignore
//! let engine = GbnEngine::new(socket, peer, file, ArqConfig::default());
//! let summary = engine.run().await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;

use crate::chunk::Chunker;
use crate::config::ArqConfig;
use crate::eot;
use crate::error::ArqError;
use crate::gbn_sender::GbnSender;
use crate::packet::{Packet, PacketType};
use crate::socket::{Socket, SocketError};
use crate::state::EngineState;
use crate::timer::RetransmitTimer;
use crate::transfer::TransferSummary;

pub struct GbnEngine<R> {
    state: EngineState,
    sender: GbnSender,
    timer: RetransmitTimer,
    chunker: Chunker<R>,
    socket: Arc<Socket>,
    peer: SocketAddr,
    config: ArqConfig,
    eot_sent: bool,
    summary: TransferSummary,
}

impl<R: AsyncRead + Unpin> GbnEngine<R> {
    pub fn new(socket: Arc<Socket>, peer: SocketAddr, input: R, config: ArqConfig) -> Self {
        Self {
            state: EngineState::Idle,
            sender: GbnSender::new(config.window_size),
            timer: RetransmitTimer::new(config.timeout),
            chunker: Chunker::new(input, config.max_payload),
            socket,
            peer,
            config,
            eot_sent: false,
            summary: TransferSummary::default(),
        }
    }

    fn enter(&mut self, next: EngineState) {
        log::debug!("[gbn] {} → {next}", self.state);
        self.state = next;
    }

    /// Drive the transfer to completion.
    ///
    /// Returns once the peer's EOT is observed.  Without a retry ceiling and
    /// without a peer response this never returns.  An invalid
    /// [`ArqConfig`] fails with [`ArqError::InvalidConfig`] before any packet
    /// is sent.
    pub async fn run(mut self) -> Result<TransferSummary, ArqError> {
        self.config.validate()?;
        self.enter(EngineState::Sending);

        loop {
            if self.state == EngineState::Draining {
                if eot::await_peer_eot(&self.socket, Some(self.timer.interval())).await? {
                    break;
                }
                continue;
            }

            // 1 + 2: bounded wait, then dispatch.
            let wait = if self.wants_input() {
                Duration::ZERO
            } else {
                self.timer.remaining()
            };
            match self.socket.recv_timeout(wait).await {
                Ok(Some((pkt, _))) => {
                    if self.handle_packet(&pkt) {
                        break;
                    }
                }
                Ok(None) => {}
                Err(SocketError::Packet(e)) => log::debug!("[gbn] dropping fragment: {e}"),
                Err(e) => return Err(e.into()),
            }

            // 3: cooperative timer.
            if self.timer.poll_expired() {
                if self.config.retries_exhausted(self.timer.fired()) {
                    return Err(ArqError::RetriesExhausted {
                        seq: self.sender.send_base,
                    });
                }
                self.retransmit_window().await?;
            }

            // 4: admit one more chunk.
            if self.wants_input() {
                if let Some(chunk) = self.chunker.next_chunk().await? {
                    self.send_new(chunk).await?;
                }
            }

            if self.chunker.is_exhausted() && !self.sender.has_unacked() && !self.eot_sent {
                self.timer.cancel();
                eot::send_eot(&self.socket, self.peer).await?;
                self.eot_sent = true;
                self.enter(EngineState::Draining);
            }
        }

        self.enter(EngineState::Done);
        self.summary.final_base = self.sender.send_base;
        log::debug!("[gbn] done: {:?}", self.summary);
        Ok(self.summary)
    }

    fn wants_input(&self) -> bool {
        self.sender.can_send() && !self.chunker.is_exhausted()
    }

    /// Returns `true` when the packet ends the transfer.
    fn handle_packet(&mut self, pkt: &Packet) -> bool {
        match pkt.ptype {
            PacketType::Ack => {
                if self.sender.on_ack(pkt.seq) {
                    if self.sender.has_unacked() {
                        self.timer.arm();
                    } else {
                        self.timer.cancel();
                    }
                    log::debug!(
                        "[gbn] ← ACK {} base={} in_flight={}",
                        pkt.seq,
                        self.sender.send_base,
                        self.sender.in_flight()
                    );
                } else {
                    log::debug!("[gbn] ← dup ACK {} (base={})", pkt.seq, self.sender.send_base);
                }
                false
            }
            PacketType::Eot => {
                log::debug!("[gbn] ← EOT");
                true
            }
            PacketType::Data | PacketType::Unknown(_) => {
                log::debug!("[gbn] ignoring {} seq={}", pkt.ptype.tag(), pkt.seq);
                false
            }
        }
    }

    async fn send_new(&mut self, chunk: Vec<u8>) -> Result<(), ArqError> {
        let len = chunk.len();
        let pkt = self.sender.build_data_packet(chunk);
        let bytes = pkt.encode();
        self.socket.send_raw(&bytes, &pkt, self.peer).await?;
        if self.sender.record_sent(pkt, bytes) {
            self.timer.arm();
        }
        self.summary.data_packets += 1;
        self.summary.payload_bytes += len as u64;
        log::debug!(
            "[gbn] → DATA seq={} len={len} in_flight={}",
            self.sender.next_seq - 1,
            self.sender.in_flight()
        );
        Ok(())
    }

    /// Retransmit every in-flight packet (the Go-Back-N step).
    async fn retransmit_window(&mut self) -> Result<(), ArqError> {
        let n = self.sender.in_flight();
        log::debug!(
            "[gbn] timeout — retransmitting {n} packet(s) from base={}",
            self.sender.send_base
        );
        for entry in self.sender.window_entries() {
            self.socket
                .send_raw(&entry.bytes, &entry.packet, self.peer)
                .await?;
        }
        self.summary.retransmissions += n as u64;
        Ok(())
    }
}
