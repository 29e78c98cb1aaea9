//! ARQ - selective-repeat reliable file transfer over UDP
//!
//! High-level API: [`send_file`] and [`receive_file`] wire a file, a UDP
//! socket and the protocol engines together. The lower layers are
//! re-exported for callers that bring their own source, sink or transport.

pub use arq_io as io;
pub use arq_protocol as protocol;

pub mod transfer;

// Re-export commonly used types
pub use protocol::{
    ArqConfig, ProgressFn, Receiver, ReceiverStats, Sender, SenderStats, Transport,
    TransportError,
};
pub use transfer::{receive_file, send_file, TransferError};
