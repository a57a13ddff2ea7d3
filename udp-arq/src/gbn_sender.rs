//! Go-Back-N send-side window.
//!
//! [`GbnSender`] maintains a sliding window of up to `N` in-flight DATA
//! packets.  It only manages state; all socket I/O and timing belong to
//! [`crate::gbn`].
//!
//! # Protocol contract
//!
//! - DATA sequence numbers start at 1 and increase by one per packet.
//! - At most `window_size` packets may be in flight at once, i.e.
//!   `next_seq - send_base <= window_size` at all times.
//! - An ACK advances the window only when it names exactly `send_base`.
//!   Every other ACK is treated as a duplicate and ignored.
//! - On timeout, the caller retransmits **all** in-flight packets from
//!   `send_base` onwards (go back to N).

use std::collections::VecDeque;

use crate::config::MAX_WINDOW;
use crate::packet::Packet;

// ---------------------------------------------------------------------------
// GbnEntry
// ---------------------------------------------------------------------------

/// A single in-flight packet occupying one slot in the retransmit window.
#[derive(Debug, Clone)]
pub struct GbnEntry {
    pub packet: Packet,
    /// The encoded datagram, kept so retransmission does not re-encode.
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// GbnSender
// ---------------------------------------------------------------------------

/// Go-Back-N send-side state for one transfer.
///
/// ```text
///  send_base          next_seq
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ <── in flight ──▶│ <── sendable ───▶
/// ```
#[derive(Debug)]
pub struct GbnSender {
    /// Sequence number of the **oldest** unacked packet (left window edge).
    pub send_base: u32,

    /// Sequence number to use for the **next** new packet.
    pub next_seq: u32,

    /// Maximum number of packets that may be in flight simultaneously (N).
    window_size: u32,

    /// In-flight packets ordered by sequence number (front = `send_base`).
    window: VecDeque<GbnEntry>,
}

impl GbnSender {
    /// Create a new [`GbnSender`] with `send_base = next_seq = 1`.
    pub fn new(window_size: u32) -> Self {
        Self {
            send_base: 1,
            next_seq: 1,
            window_size,
            window: VecDeque::with_capacity(window_size.min(MAX_WINDOW) as usize),
        }
    }

    /// `true` when there is room for at least one more in-flight packet.
    pub fn can_send(&self) -> bool {
        self.next_seq < self.send_base.saturating_add(self.window_size)
    }

    /// Number of packets currently awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.window.len()
    }

    pub fn has_unacked(&self) -> bool {
        !self.window.is_empty()
    }

    /// Build a DATA packet carrying the next sequence number.
    ///
    /// Call [`record_sent`](Self::record_sent) after transmitting it.
    pub fn build_data_packet(&self, payload: Vec<u8>) -> Packet {
        Packet::data(self.next_seq, payload)
    }

    /// Place a just-transmitted packet into the window and advance `next_seq`.
    ///
    /// Returns `true` when the packet is the only one in flight, which is
    /// when the caller must start the retransmission timer.
    pub fn record_sent(&mut self, packet: Packet, bytes: Vec<u8>) -> bool {
        debug_assert!(
            self.can_send(),
            "record_sent called on a full GBN window ({} / {})",
            self.window.len(),
            self.window_size
        );
        debug_assert_eq!(packet.seq, self.next_seq);
        self.window.push_back(GbnEntry {
            packet,
            bytes,
        });
        self.next_seq += 1;
        self.window.len() == 1
    }

    /// Process an ACK for `seq`.
    ///
    /// Slides the window by one and returns `true` only when `seq` is the
    /// current `send_base`; returns `false` (state untouched) for anything else.
    pub fn on_ack(&mut self, seq: u32) -> bool {
        if seq != self.send_base || self.window.is_empty() {
            return false;
        }
        self.window.pop_front();
        self.send_base += 1;
        true
    }

    /// Iterate over all in-flight packets from oldest to newest.
    pub fn window_entries(&self) -> impl Iterator<Item = &GbnEntry> {
        self.window.iter()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
