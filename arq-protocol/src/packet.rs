//! ARQ Packet Structures and Serialization
//!
//! A data packet is a 2-byte header followed by the payload:
//!
//! ```text
//!  byte 0      byte 1          bytes 2..
//! ┌──────────┬───────────────┬──────────────────────┐
//! │ seq (u8) │ end-of-stream │ payload (0..=500 B)  │
//! └──────────┴───────────────┴──────────────────────┘
//! ```
//!
//! An acknowledgement is a single byte echoing the sequence number it acks.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Size of the data packet header in bytes (sequence number + end-of-stream flag)
pub const HEADER_SIZE: usize = 2;

/// Default payload capacity of one data packet
pub const DEFAULT_DATA_SIZE: usize = 500;

/// Size of an acknowledgement datagram
pub const ACK_SIZE: usize = 1;

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Data packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Sequence number of this packet
    pub seq: u8,
    /// Set only on the very last packet of the transfer
    pub end_of_stream: bool,
}

impl PacketHeader {
    /// Create a new header
    pub fn new(seq: u8, end_of_stream: bool) -> Self {
        PacketHeader { seq, end_of_stream }
    }

    /// Parse header from bytes
    ///
    /// Any nonzero flag byte counts as end-of-stream.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PacketError::InsufficientData {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_SIZE];
        Ok(PacketHeader {
            seq: buf.get_u8(),
            end_of_stream: buf.get_u8() != 0,
        })
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self, buf: &mut BytesMut) {
        buf.put_u8(self.seq);
        buf.put_u8(u8::from(self.end_of_stream));
    }
}

/// Data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    /// Packet header
    pub header: PacketHeader,
    /// Payload data
    pub payload: Bytes,
}

impl DataPacket {
    /// Create a new data packet
    pub fn new(seq: u8, end_of_stream: bool, payload: Bytes) -> Self {
        DataPacket {
            header: PacketHeader::new(seq, end_of_stream),
            payload,
        }
    }

    /// Get the sequence number
    #[inline]
    pub fn seq(&self) -> u8 {
        self.header.seq
    }

    /// Whether this is the final packet of the transfer
    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        self.header.end_of_stream
    }

    /// Total size of the packet (header + payload)
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize the packet to bytes
    pub fn to_bytes(&self) -> BytesMut {
        encode(self.header.seq, self.header.end_of_stream, &self.payload)
    }

    /// Parse a data packet from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        let (header, payload) = decode(bytes)?;
        Ok(DataPacket {
            header,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// Acknowledgement packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    /// Echoed sequence number
    pub seq: u8,
}

impl AckPacket {
    pub fn new(seq: u8) -> Self {
        AckPacket { seq }
    }

    pub fn to_bytes(&self) -> [u8; ACK_SIZE] {
        [self.seq]
    }

    /// Parse an ack; trailing bytes are ignored
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        match bytes.first() {
            Some(&seq) => Ok(AckPacket { seq }),
            None => Err(PacketError::InsufficientData {
                expected: ACK_SIZE,
                actual: 0,
            }),
        }
    }
}

impl fmt::Display for AckPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ACK({})", self.seq)
    }
}

/// Encode a data packet onto the wire
pub fn encode(seq: u8, end_of_stream: bool, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    PacketHeader::new(seq, end_of_stream).to_bytes(&mut buf);
    buf.put_slice(payload);
    buf
}

/// Decode a data packet, borrowing the payload from the datagram
pub fn decode(bytes: &[u8]) -> Result<(PacketHeader, &[u8]), PacketError> {
    let header = PacketHeader::from_bytes(bytes)?;
    Ok((header, &bytes[HEADER_SIZE..]))
}

/// Wire size of a packet carved out of a chunk of `chunk_len` bytes
///
/// Every packet is full size except the last one of a chunk, which carries
/// `chunk_len % data_size` bytes. A remainder of zero is treated as a full
/// last packet; peers depend on this exact sizing, so keep it.
pub fn packet_size(chunk_len: usize, is_last_in_chunk: bool, data_size: usize) -> usize {
    if !is_last_in_chunk {
        return HEADER_SIZE + data_size;
    }

    match chunk_len % data_size {
        0 => HEADER_SIZE + data_size,
        remainder => HEADER_SIZE + remainder,
    }
}

/// Packet parsing and validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
}
