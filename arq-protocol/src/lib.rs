//! Selective-repeat ARQ core
//!
//! This crate implements the transfer protocol independent of any socket:
//! the two-byte packet codec, the wrapping window sequence space, per-window
//! acknowledgement tracking, and the sender and receiver engines that drive
//! a [`Transport`].
//!
//! ```text
//!  Sender                                   Receiver
//!  ------                                   --------
//!  read chunk (W * D bytes)
//!  send unacked slots  ---- DATA(seq) --->  copy payload to slot, ack
//!  gather acks         <--- ACK(seq) -----  (acks every decodable packet)
//!  all acked? advance                       window full? flush, advance
//! ```

pub mod config;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod sequence;
pub mod stream;
pub mod transport;
pub mod window;

#[cfg(test)]
mod testing;

pub use config::{ArqConfig, ConfigError, DEFAULT_ACK_TIMEOUT, DEFAULT_MAX_SILENT_ATTEMPTS};
pub use packet::{
    decode, encode, packet_size, AckPacket, DataPacket, PacketError, PacketHeader,
    DEFAULT_DATA_SIZE, HEADER_SIZE,
};
pub use receiver::{Receiver, ReceiverError, ReceiverState, ReceiverStats};
pub use sender::{ProgressFn, Sender, SenderError, SenderState, SenderStats};
pub use sequence::{SeqClass, SequenceSpace, WindowBase, DEFAULT_MAX_START_SEQ, DEFAULT_WINDOW_SIZE};
pub use stream::{Chunk, ChunkReader};
pub use transport::{Transport, TransportError};
pub use window::{MarkOutcome, WindowTracker};
