//! Selective-Repeat send-side window.
//!
//! Unlike [`crate::gbn_sender::GbnSender`], acknowledgments here are per
//! packet: each ACK retires exactly the sequence number it names, in any
//! order.  `base` only moves across a *consecutive* run of acknowledged
//! sequence numbers, so a gap holds it back no matter how many later packets
//! are already acknowledged.
//!
//! The window is plain state.  [`crate::selective_repeat`] shares it between
//! the main loop and the reliability workers behind a mutex.

use std::collections::{BTreeMap, BTreeSet};

use crate::packet::Packet;

#[derive(Debug)]
pub struct SrWindow {
    base: u32,
    next_seq: u32,
    window_size: u32,
    /// Encoded bytes of every packet sent but not yet acknowledged; workers
    /// retransmit from here.
    sent: BTreeMap<u32, Vec<u8>>,
    /// Sequence numbers still waiting for their ACK.
    pending: BTreeSet<u32>,
    /// Acknowledged sequence numbers at or above `base`, not yet folded in.
    acked: BTreeSet<u32>,
}

impl SrWindow {
    pub fn new(window_size: u32) -> Self {
        Self {
            base: 1,
            next_seq: 1,
            window_size,
            sent: BTreeMap::new(),
            pending: BTreeSet::new(),
            acked: BTreeSet::new(),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    pub fn can_send(&self) -> bool {
        self.next_seq < self.base.saturating_add(self.window_size)
    }

    /// `true` when every packet handed out so far is acknowledged.
    pub fn is_drained(&self) -> bool {
        self.base == self.next_seq
    }

    /// Frame `payload` with the next sequence number and track it as pending.
    ///
    /// Returns the packet along with its encoded bytes.
    pub fn admit(&mut self, payload: Vec<u8>) -> (Packet, Vec<u8>) {
        debug_assert!(self.can_send(), "admit called on a full SR window");
        let packet = Packet::data(self.next_seq, payload);
        let bytes = packet.encode();
        self.sent.insert(packet.seq, bytes.clone());
        self.pending.insert(packet.seq);
        self.next_seq += 1;
        (packet, bytes)
    }

    /// Record an ACK for `seq`.
    ///
    /// Returns `false` for anything that is not pending: duplicates,
    /// already-acknowledged packets and sequence numbers never sent.
    pub fn record_ack(&mut self, seq: u32) -> bool {
        if !self.pending.remove(&seq) {
            return false;
        }
        self.sent.remove(&seq);
        self.acked.insert(seq);
        true
    }

    pub fn is_acked(&self, seq: u32) -> bool {
        seq < self.base || self.acked.contains(&seq)
    }

    /// Encoded bytes for a still-unacknowledged packet.
    pub fn sent_bytes(&self, seq: u32) -> Option<&[u8]> {
        self.sent.get(&seq).map(Vec::as_slice)
    }

    /// Advance `base` over the consecutive acknowledged prefix.
    ///
    /// Returns how many positions `base` moved.
    pub fn reconcile(&mut self) -> u32 {
        let start = self.base;
        while self.acked.remove(&self.base) {
            self.base += 1;
        }
        self.base - start
    }
}
