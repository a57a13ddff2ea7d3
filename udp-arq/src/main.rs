//! Entry point for `udp-arq`.
//!
//! Parses CLI arguments and dispatches into **send**, **receive** or
//! **channel** mode.  All protocol work is delegated to library modules;
//! `main.rs` owns only process setup (logging, argument parsing, exit status).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use udp_arq::config::{ArqConfig, RendezvousConfig, CHANNEL_INFO_FILE, MAX_PAYLOAD, WINDOW_SIZE};
use udp_arq::receiver::receive_file;
use udp_arq::rendezvous::publish_peer;
use udp_arq::simulator::{LossyChannel, SimulatorConfig};
use udp_arq::socket::Socket;
use udp_arq::Protocol;

/// Reliable file transfer over UDP (Go-Back-N / Selective-Repeat).
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to the peer named in the channel-info file.
    Send {
        #[arg(short, long, value_enum)]
        protocol: Protocol,
        /// File to send.
        #[arg(short, long)]
        file: PathBuf,
        /// Retransmission timeout in milliseconds.
        #[arg(short, long, default_value_t = 100)]
        timeout_ms: u64,
        /// File holding the peer's `host port`.
        #[arg(long, default_value = CHANNEL_INFO_FILE)]
        channel_info: PathBuf,
        /// Rendezvous attempts before giving up.
        #[arg(long, default_value_t = 6)]
        attempts: u32,
        /// Seconds between rendezvous attempts.
        #[arg(long, default_value_t = 10)]
        attempt_interval: u64,
        #[arg(long, default_value_t = WINDOW_SIZE)]
        window: u32,
        #[arg(long, default_value_t = MAX_PAYLOAD)]
        max_payload: usize,
        /// Abort after this many timeouts for one packet (default: never).
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Receive one file and write it to disk.
    Receive {
        #[arg(short, long, value_enum)]
        protocol: Protocol,
        /// Where to write the received bytes.
        #[arg(short, long)]
        output: PathBuf,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        /// Write the bound `host port` here for a sender or channel to find.
        #[arg(long)]
        publish: Option<PathBuf>,
        #[arg(long, default_value_t = WINDOW_SIZE)]
        window: u32,
    },
    /// Relay between a sender and a receiver, injecting loss.
    Channel {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:0")]
        listen: SocketAddr,
        /// Receiver address to forward DATA toward.
        #[arg(short, long)]
        receiver: SocketAddr,
        #[arg(long, default_value_t = 0.0)]
        loss: f64,
        #[arg(long, default_value_t = 0.0)]
        duplicate: f64,
        #[arg(long, default_value_t = 0.0)]
        reorder: f64,
        /// Delay in milliseconds applied to reordered packets.
        #[arg(long, default_value_t = 50)]
        reorder_delay_ms: u64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Write the relay's `host port` here for the sender to find.
        #[arg(long)]
        publish: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            protocol,
            file,
            timeout_ms,
            channel_info,
            attempts,
            attempt_interval,
            window,
            max_payload,
            max_retries,
        } => {
            let config = ArqConfig {
                window_size: window,
                max_payload,
                max_retries,
                ..ArqConfig::default()
            }
            .with_timeout_ms(timeout_ms);
            let rendezvous = RendezvousConfig {
                path: channel_info,
                attempts,
                interval: Duration::from_secs(attempt_interval),
            };

            let summary = udp_arq::send_file(protocol, &file, &rendezvous, &config)
                .await
                .with_context(|| format!("sending {}", file.display()))?;
            log::info!(
                "transfer complete: {} packet(s), {} byte(s), {} retransmission(s)",
                summary.data_packets,
                summary.payload_bytes,
                summary.retransmissions
            );
        }
        Mode::Receive {
            protocol,
            output,
            bind,
            publish,
            window,
        } => {
            let socket = Socket::bind(bind).await.context("binding receiver socket")?;
            log::info!("receiving on {}", socket.local_addr);
            if let Some(path) = publish {
                publish_peer(&path, socket.local_addr)
                    .await
                    .with_context(|| format!("publishing to {}", path.display()))?;
            }

            let mut file = tokio::fs::File::create(&output)
                .await
                .with_context(|| format!("creating {}", output.display()))?;
            receive_file(&socket, protocol, window, &mut file).await?;
        }
        Mode::Channel {
            listen,
            receiver,
            loss,
            duplicate,
            reorder,
            reorder_delay_ms,
            seed,
            publish,
        } => {
            let config = SimulatorConfig {
                loss_rate: loss,
                duplicate_rate: duplicate,
                reorder_rate: reorder,
                reorder_delay: Duration::from_millis(reorder_delay_ms),
                seed,
            };
            let channel = LossyChannel::bind(listen, receiver, config).await?;
            let addr = channel.local_addr()?;
            log::info!("channel relaying {addr} → {receiver}");
            if let Some(path) = publish {
                publish_peer(&path, addr).await?;
            }
            channel.run().await?;
        }
    }

    Ok(())
}
