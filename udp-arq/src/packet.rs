//! Wire-format definitions for ARQ packets.
//!
//! Every datagram exchanged between sender and receiver is a [`Packet`].  This
//! module is responsible for:
//! - Defining the on-wire binary layout (type, length, sequence number, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Parsing a raw byte slice back into a [`Packet`].
//!
//! No I/O happens here.
//!
//! # Wire format
//!
//! All integers are **big-endian** `u32`.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |               Type (0 = DATA, 1 = ACK, 2 = EOT)               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              Length (header + payload, in bytes)              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Payload ... (DATA only)                     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! # Leniency
//!
//! Decoding only rejects buffers shorter than [`HEADER_LEN`].  There is no
//! checksum and the `length` field is not cross-checked against the datagram
//! size; a DATA payload is simply whatever follows the header, capped at
//! `length - HEADER_LEN`.  Corruption detection is not part of this protocol.

use thiserror::Error;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 12;

/// Sequence number carried by every EOT packet.
pub const EOT_SEQ: u32 = 0;

// Byte offsets of each field within the serialised header.
const OFF_TYPE: usize = 0;
const OFF_LENGTH: usize = 4;
const OFF_SEQ: usize = 8;

/// Packet type discriminant as it appears in the first header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Data,
    Ack,
    Eot,
    /// Any other type code; kept so decoding never fails on it.
    Unknown(u32),
}

impl PacketType {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => PacketType::Data,
            1 => PacketType::Ack,
            2 => PacketType::Eot,
            other => PacketType::Unknown(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            PacketType::Data => 0,
            PacketType::Ack => 1,
            PacketType::Eot => 2,
            PacketType::Unknown(v) => v,
        }
    }

    /// Three-letter tag used in packet event logs.
    pub fn tag(self) -> &'static str {
        match self {
            PacketType::Data => "DAT",
            PacketType::Ack => "ACK",
            PacketType::Eot => "EOT",
            PacketType::Unknown(_) => "UNK",
        }
    }
}

/// A complete protocol datagram: header fields + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub ptype: PacketType,
    /// Total encoded length (header + payload).
    ///
    /// On encode this is recomputed from the payload; on decode it is the
    /// value found on the wire.
    pub length: u32,
    pub seq: u32,
    /// Present only for DATA packets.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a packet of any type; `length` is derived from the payload.
    pub fn new(ptype: PacketType, seq: u32, payload: Vec<u8>) -> Self {
        Self {
            ptype,
            length: (HEADER_LEN + payload.len()) as u32,
            seq,
            payload,
        }
    }

    pub fn data(seq: u32, payload: Vec<u8>) -> Self {
        Self::new(PacketType::Data, seq, payload)
    }

    pub fn ack(seq: u32) -> Self {
        Self::new(PacketType::Ack, seq, Vec::new())
    }

    pub fn eot() -> Self {
        Self::new(PacketType::Eot, EOT_SEQ, Vec::new())
    }

    /// Serialise this packet into a newly allocated byte vector.
    ///
    /// The `length` field is always written as the real encoded size.  Only
    /// DATA packets carry their payload onto the wire.
    pub fn encode(&self) -> Vec<u8> {
        let payload: &[u8] = match self.ptype {
            PacketType::Data => &self.payload,
            _ => &[],
        };
        encode(self.ptype, self.seq, payload)
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`PacketError::Malformed`] only when `buf` is shorter than
    /// [`HEADER_LEN`].  See the module docs for what is *not* validated.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::Malformed { len: buf.len() });
        }

        let ptype = PacketType::from_u32(read_u32(buf, OFF_TYPE));
        let length = read_u32(buf, OFF_LENGTH);
        let seq = read_u32(buf, OFF_SEQ);

        let payload = if ptype == PacketType::Data {
            let declared = (length as usize).saturating_sub(HEADER_LEN);
            let end = HEADER_LEN + declared.min(buf.len() - HEADER_LEN);
            buf[HEADER_LEN..end].to_vec()
        } else {
            Vec::new()
        };

        Ok(Packet {
            ptype,
            length,
            seq,
            payload,
        })
    }
}

/// Encode a packet straight from its parts.
pub fn encode(ptype: PacketType, seq: u32, payload: &[u8]) -> Vec<u8> {
    let total = HEADER_LEN + payload.len();
    let mut buf = vec![0u8; total];

    buf[OFF_TYPE..OFF_TYPE + 4].copy_from_slice(&ptype.to_u32().to_be_bytes());
    buf[OFF_LENGTH..OFF_LENGTH + 4].copy_from_slice(&(total as u32).to_be_bytes());
    buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&seq.to_be_bytes());
    buf[HEADER_LEN..].copy_from_slice(payload);

    buf
}

#[inline]
fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("malformed packet: {len} byte(s) is shorter than the {HEADER_LEN}-byte header")]
    Malformed { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_layout() {
        let bytes = Packet::data(7, b"hello".to_vec()).encode();
        assert_eq!(bytes.len(), HEADER_LEN + 5);
        assert_eq!(&bytes[OFF_TYPE..OFF_TYPE + 4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[OFF_LENGTH..OFF_LENGTH + 4], &[0, 0, 0, 17]);
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0, 0, 0, 7]);
        assert_eq!(&bytes[HEADER_LEN..], b"hello");
    }

    #[test]
    fn ack_and_eot_are_header_only() {
        let ack = Packet::ack(3).encode();
        assert_eq!(ack.len(), HEADER_LEN);
        assert_eq!(&ack[..4], &[0, 0, 0, 1]);
        assert_eq!(&ack[4..8], &[0, 0, 0, 12]);

        let eot = Packet::eot().encode();
        assert_eq!(eot, vec![0, 0, 0, 2, 0, 0, 0, 12, 0, 0, 0, 0]);
    }

    #[test]
    fn ack_never_carries_payload_on_the_wire() {
        let pkt = Packet::new(PacketType::Ack, 9, b"junk".to_vec());
        assert_eq!(pkt.encode().len(), HEADER_LEN);
    }

    #[test]
    fn decode_data_packet() {
        let bytes = Packet::data(42, b"abc".to_vec()).encode();
        let pkt = Packet::decode(&bytes).unwrap();
        assert_eq!(pkt.ptype, PacketType::Data);
        assert_eq!(pkt.length, 15);
        assert_eq!(pkt.seq, 42);
        assert_eq!(pkt.payload, b"abc");
    }

    #[test]
    fn decode_short_buffer_is_malformed() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::Malformed { len: 0 }));
        assert_eq!(
            Packet::decode(&[0u8; HEADER_LEN - 1]),
            Err(PacketError::Malformed { len: 11 })
        );
    }

    #[test]
    fn decode_caps_payload_at_declared_length() {
        let mut bytes = Packet::data(1, b"12345".to_vec()).encode();
        bytes.extend_from_slice(b"trailing");
        let pkt = Packet::decode(&bytes).unwrap();
        assert_eq!(pkt.payload, b"12345");
    }

    #[test]
    fn decode_truncated_payload_is_tolerated() {
        let mut bytes = Packet::data(1, b"12345".to_vec()).encode();
        bytes.truncate(HEADER_LEN + 2);
        let pkt = Packet::decode(&bytes).unwrap();
        assert_eq!(pkt.length, 17);
        assert_eq!(pkt.payload, b"12");
    }

    #[test]
    fn decode_ignores_bytes_after_ack_header() {
        let mut bytes = Packet::ack(5).encode();
        bytes.extend_from_slice(b"xx");
        let pkt = Packet::decode(&bytes).unwrap();
        assert_eq!(pkt.ptype, PacketType::Ack);
        assert!(pkt.payload.is_empty());
    }

    #[test]
    fn unknown_type_code_survives_decode() {
        let bytes = encode(PacketType::Unknown(9), 1, &[]);
        let pkt = Packet::decode(&bytes).unwrap();
        assert_eq!(pkt.ptype, PacketType::Unknown(9));
        assert_eq!(pkt.ptype.tag(), "UNK");
    }

    #[test]
    fn corrupted_payload_is_not_detected() {
        let mut bytes = Packet::data(2, b"data".to_vec()).encode();
        bytes[HEADER_LEN] ^= 0xff;
        let pkt = Packet::decode(&bytes).unwrap();
        assert_ne!(pkt.payload, b"data");
    }
}
