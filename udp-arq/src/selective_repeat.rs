//! Selective-Repeat sending engine.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────────────────────┐
//!  input ──▶ │ main loop                    │  reconcile base, admit chunks,
//!            │  (SrEngine::run)             │  spawn one worker per packet
//!            └──────┬──────────────▲────────┘
//!                   │ spawn        │ watch: ack generation
//!            ┌──────▼──────┐ ┌─────┴───────┐
//!            │ worker seq=n│ │ worker n+1  │ ...   each: send, wait, resend
//!            └──────┬──────┘ └─────┬───────┘
//!                   │  Mutex<SrWindow>  │
//!                   └────────┬─────────┘
//!                       Arc<Socket> (shared receive)
//! ```
//!
//! Every in-flight DATA packet has its own reliability worker with its own
//! retransmission deadline.  All workers receive from the same socket; whichever
//! worker reads an ACK records it in the shared window, even when the ACK
//! belongs to another worker's packet, and bumps the ack generation so the
//! owner (and the main loop) wake up.  A worker exits once its own sequence
//! number is acknowledged.
//!
//! The window mutex is only held for short, non-`await`ing critical sections.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::chunk::Chunker;
use crate::config::ArqConfig;
use crate::eot;
use crate::error::ArqError;
use crate::packet::{Packet, PacketType};
use crate::socket::{Socket, SocketError};
use crate::sr_window::SrWindow;
use crate::state::EngineState;
use crate::transfer::TransferSummary;

/// State reachable from the main loop and every worker.
struct Shared {
    socket: Arc<Socket>,
    peer: SocketAddr,
    config: ArqConfig,
    window: Mutex<SrWindow>,
    /// Bumped after every newly recorded ACK.
    acks: watch::Sender<u64>,
}

impl Shared {
    fn window(&self) -> MutexGuard<'_, SrWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SrEngine<R> {
    state: EngineState,
    shared: Arc<Shared>,
    chunker: Chunker<R>,
    workers: JoinSet<Result<u64, ArqError>>,
    summary: TransferSummary,
}

impl<R: AsyncRead + Unpin> SrEngine<R> {
    pub fn new(socket: Arc<Socket>, peer: SocketAddr, input: R, config: ArqConfig) -> Self {
        let (acks, _) = watch::channel(0u64);
        let chunker = Chunker::new(input, config.max_payload);
        let window = Mutex::new(SrWindow::new(config.window_size));
        Self {
            state: EngineState::Idle,
            shared: Arc::new(Shared {
                socket,
                peer,
                config,
                window,
                acks,
            }),
            chunker,
            workers: JoinSet::new(),
            summary: TransferSummary::default(),
        }
    }

    fn enter(&mut self, next: EngineState) {
        log::debug!("[sr] {} → {next}", self.state);
        self.state = next;
    }

    /// Drive the transfer to completion.
    ///
    /// The final wait for the peer's EOT has no timeout: against a silent
    /// peer this never returns.
    pub async fn run(mut self) -> Result<TransferSummary, ArqError> {
        self.shared.config.validate()?;
        self.enter(EngineState::Sending);
        let mut acks = self.shared.acks.subscribe();

        loop {
            let (drained, can_send) = {
                let mut window = self.shared.window();
                let advanced = window.reconcile();
                if advanced > 0 {
                    log::debug!("[sr] base → {}", window.base());
                }
                (window.is_drained(), window.can_send())
            };

            if self.chunker.is_exhausted() && drained {
                break;
            }

            if can_send && !self.chunker.is_exhausted() {
                if let Some(chunk) = self.chunker.next_chunk().await? {
                    self.spawn_worker(chunk);
                }
                continue;
            }

            // Window full or input done: sleep until an ACK lands or a worker exits.
            tokio::select! {
                _ = acks.changed() => {}
                Some(joined) = self.workers.join_next() => self.collect(joined)?,
            }
        }

        // Join phase.
        while let Some(joined) = self.workers.join_next().await {
            self.collect(joined)?;
        }

        // EOT phase.
        self.enter(EngineState::Draining);
        eot::send_eot(&self.shared.socket, self.shared.peer).await?;
        eot::await_peer_eot(&self.shared.socket, None).await?;

        self.enter(EngineState::Done);
        self.summary.final_base = self.shared.window().base();
        log::debug!("[sr] done: {:?}", self.summary);
        Ok(self.summary)
    }

    fn spawn_worker(&mut self, chunk: Vec<u8>) {
        let len = chunk.len();
        let (packet, bytes) = self.shared.window().admit(chunk);
        self.summary.data_packets += 1;
        self.summary.payload_bytes += len as u64;
        log::debug!("[sr] spawning worker for seq={} len={len}", packet.seq);

        let shared = Arc::clone(&self.shared);
        let acks = self.shared.acks.subscribe();
        self.workers.spawn(reliability_worker(shared, packet, bytes, acks));
    }

    fn collect(
        &mut self,
        joined: Result<Result<u64, ArqError>, JoinError>,
    ) -> Result<(), ArqError> {
        match joined {
            Ok(Ok(retransmissions)) => {
                self.summary.retransmissions += retransmissions;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(ArqError::Worker(e.to_string())),
        }
    }
}

/// Deliver one DATA packet: send it, then resend on every expired deadline
/// until its sequence number shows up as acknowledged.
///
/// Retransmissions read the encoded packet back from the shared window; once
/// it is gone from there the packet has been acknowledged.
///
/// Returns the number of retransmissions.
async fn reliability_worker(
    shared: Arc<Shared>,
    packet: Packet,
    bytes: Vec<u8>,
    mut acks: watch::Receiver<u64>,
) -> Result<u64, ArqError> {
    let seq = packet.seq;
    let timeout = shared.config.timeout;
    shared.socket.send_raw(&bytes, &packet, shared.peer).await?;

    let mut retransmissions = 0u64;
    let mut deadline = Instant::now() + timeout;

    loop {
        if shared.window().is_acked(seq) {
            log::debug!("[sr] worker seq={seq} finished after {retransmissions} resend(s)");
            return Ok(retransmissions);
        }

        tokio::select! {
            received = shared.socket.recv_from() => match received {
                Ok((pkt, _)) if pkt.ptype == PacketType::Ack => {
                    if shared.window().record_ack(pkt.seq) {
                        log::debug!("[sr] worker seq={seq} ← ACK {}", pkt.seq);
                        shared.acks.send_modify(|generation| *generation += 1);
                    } else {
                        log::debug!("[sr] worker seq={seq} ← dup ACK {}", pkt.seq);
                    }
                }
                Ok((pkt, _)) => {
                    log::debug!(
                        "[sr] worker seq={seq} ignoring {} seq={}",
                        pkt.ptype.tag(),
                        pkt.seq
                    );
                }
                Err(SocketError::Packet(e)) => log::debug!("[sr] dropping fragment: {e}"),
                Err(e) => return Err(e.into()),
            },
            _ = tokio::time::sleep_until(deadline) => {
                let Some(resend) = shared.window().sent_bytes(seq).map(<[u8]>::to_vec) else {
                    continue;
                };
                retransmissions += 1;
                if shared.config.retries_exhausted(retransmissions as u32) {
                    return Err(ArqError::RetriesExhausted { seq });
                }
                log::debug!("[sr] worker seq={seq} timeout, resend #{retransmissions}");
                shared.socket.send_raw(&resend, &packet, shared.peer).await?;
                deadline = Instant::now() + timeout;
            }
            _ = acks.changed() => {}
        }
    }
}
