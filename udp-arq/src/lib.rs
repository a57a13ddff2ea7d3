//! `udp-arq` — reliable file transfer over UDP with Go-Back-N and
//! Selective-Repeat sliding windows.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────┐   DATA    ┌──────────────┐   DATA    ┌──────────┐
//!  │  Sender   │──────────▶│ LossyChannel │──────────▶│ Receiver │
//!  │ GBN | SR  │◀──────────│  (optional)  │◀──────────│          │
//!  └────┬──────┘  ACK/EOT  └──────────────┘  ACK/EOT  └──────────┘
//!       │
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]           — wire format (serialise / deserialise)
//! - [`event`]            — per-packet SEND/RECV log records
//! - [`socket`]           — async UDP socket abstraction
//! - [`error`]            — error taxonomy
//! - [`config`]           — transfer and rendezvous parameters
//! - [`timer`]            — cooperative retransmission deadline
//! - [`chunk`]            — fixed-size chunking of the input
//! - [`rendezvous`]       — peer address discovery through a shared file
//! - [`state`]            — engine finite-state-machine types
//! - [`gbn_sender`]       — Go-Back-N window bookkeeping
//! - [`gbn`]              — Go-Back-N sending engine
//! - [`sr_window`]        — Selective-Repeat window bookkeeping
//! - [`selective_repeat`] — Selective-Repeat sending engine
//! - [`eot`]              — end-of-transmission handshake
//! - [`receiver`]         — receive side for both protocols
//! - [`simulator`]        — lossy relay for testing
//! - [`transfer`]         — high-level send entry points

pub mod chunk;
pub mod config;
pub mod eot;
pub mod error;
pub mod event;
pub mod gbn;
pub mod gbn_sender;
pub mod packet;
pub mod receiver;
pub mod rendezvous;
pub mod selective_repeat;
pub mod simulator;
pub mod socket;
pub mod sr_window;
pub mod state;
pub mod timer;
pub mod transfer;

pub use config::{ArqConfig, RendezvousConfig};
pub use error::ArqError;
pub use transfer::{send_file, send_stream, Protocol, TransferSummary};
