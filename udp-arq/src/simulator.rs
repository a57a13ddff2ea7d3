//! Lossy network channel for exercising retransmission.
//!
//! Real networks drop, reorder, and duplicate packets.  [`LossyChannel`] is a
//! UDP relay placed between a sender and a receiver; it forwards datagrams in
//! both directions and applies a configurable, seeded fault model:
//!
//! | Fault            | Description                                        |
//! |------------------|----------------------------------------------------|
//! | Packet loss      | Drop a packet with probability `loss_rate`.        |
//! | Reordering       | Hold a packet back by `reorder_delay`, letting     |
//! |                  | later packets overtake it.                         |
//! | Duplication      | Deliver a packet twice.                            |
//!
//! Faults only apply to DATA and ACK packets.  EOT packets, whose handshake
//! is sent once and never retried, always pass through untouched.
//!
//! The relay learns the sender's address from the first datagram that does
//! not come from the receiver.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketType};

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given packet is silently dropped.
    pub loss_rate: f64,
    /// Probability that a packet is reordered.
    pub reorder_rate: f64,
    /// Fixed delay applied to reordered packets.
    pub reorder_delay: Duration,
    /// Probability that a packet is duplicated.
    pub duplicate_rate: f64,
    /// RNG seed, so a failing run can be replayed.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults: a transparent relay.
        Self {
            loss_rate: 0.0,
            reorder_rate: 0.0,
            reorder_delay: Duration::ZERO,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

/// What the fault model decided for one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Drop,
    Deliver { copies: u8, delayed: bool },
}

/// The decision half of the channel, separate from I/O so it can be tested.
pub struct FaultModel {
    config: SimulatorConfig,
    rng: StdRng,
}

impl FaultModel {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn decide(&mut self, datagram: &[u8]) -> Fate {
        let faultable = matches!(
            Packet::decode(datagram).map(|p| p.ptype),
            Ok(PacketType::Data) | Ok(PacketType::Ack)
        );
        if !faultable {
            return Fate::Deliver {
                copies: 1,
                delayed: false,
            };
        }

        if self.roll(self.config.loss_rate) {
            return Fate::Drop;
        }
        let copies = if self.roll(self.config.duplicate_rate) { 2 } else { 1 };
        let delayed = self.roll(self.config.reorder_rate);
        Fate::Deliver { copies, delayed }
    }

    fn roll(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }
}

/// A fault-injecting UDP relay.
pub struct LossyChannel {
    socket: Arc<UdpSocket>,
    receiver: SocketAddr,
    model: FaultModel,
    reorder_delay: Duration,
}

impl LossyChannel {
    /// Bind the relay on `listen`, forwarding toward `receiver`.
    pub async fn bind(
        listen: SocketAddr,
        receiver: SocketAddr,
        config: SimulatorConfig,
    ) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(listen).await?);
        Ok(Self {
            socket,
            receiver,
            reorder_delay: config.reorder_delay,
            model: FaultModel::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Relay datagrams until an I/O error occurs.
    pub async fn run(mut self) -> io::Result<()> {
        let mut buf = vec![0u8; 65_535];
        let mut sender: Option<SocketAddr> = None;

        loop {
            let (n, from) = self.socket.recv_from(&mut buf).await?;
            let dest = if from == self.receiver {
                match sender {
                    Some(addr) => addr,
                    None => continue,
                }
            } else {
                sender = Some(from);
                self.receiver
            };

            let datagram = buf[..n].to_vec();
            match self.model.decide(&datagram) {
                Fate::Drop => log::debug!("[channel] dropped {n} byte(s) {from} → {dest}"),
                Fate::Deliver { copies, delayed } => {
                    if delayed {
                        let socket = Arc::clone(&self.socket);
                        let delay = self.reorder_delay;
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            for _ in 0..copies {
                                if let Err(e) = socket.send_to(&datagram, dest).await {
                                    log::debug!("[channel] delayed send to {dest} failed: {e}");
                                }
                            }
                        });
                    } else {
                        for _ in 0..copies {
                            self.socket.send_to(&datagram, dest).await?;
                        }
                    }
                }
            }
        }
    }
}
