//! Receiver engine
//!
//! Purely reactive: every decodable datagram is acknowledged, but only new
//! packets of the active window are copied into the assembly buffer. Once
//! every expected slot is filled the window is flushed to the sink in slot
//! order and the cursor advances, mirroring the sender.
//!
//! The receiver never times out. If the sender disappears mid-transfer it
//! blocks until the process is terminated.

use crate::config::{ArqConfig, ConfigError};
use crate::packet::{AckPacket, PacketHeader, HEADER_SIZE};
use crate::sender::ProgressFn;
use crate::sequence::WindowBase;
use crate::transport::{Transport, TransportError};
use crate::window::{MarkOutcome, WindowTracker};
use std::io::{self, Write};
use thiserror::Error;

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    /// Blocked on the transport
    AwaitPackets,
    /// Copying an accepted payload into its slot
    Assemble,
    /// Writing a completed window to the sink
    Flush,
    Advance,
    /// End-of-stream window flushed
    Done,
    Fatal,
}

/// Receiver errors; all of them abort the transfer
#[derive(Error, Debug)]
pub enum ReceiverError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Sink write failed: {0}")]
    Sink(#[source] io::Error),
}

/// Receiver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Payload bytes written to the sink
    pub bytes_received: u64,
    /// Windows flushed
    pub windows_received: u64,
    /// Packets copied into the assembly buffer
    pub packets_accepted: u64,
    /// Packets for slots already filled
    pub duplicate_packets: u64,
    /// Packets from another window
    pub stale_packets: u64,
    /// Packets outside the sequence space
    pub invalid_packets: u64,
    /// Datagrams too short to carry a header
    pub malformed_datagrams: u64,
    /// Acks put on the wire
    pub acks_sent: u64,
}

/// Selective-repeat receiver for one transfer
pub struct Receiver<T> {
    transport: T,
    config: ArqConfig,
    window: WindowTracker,
    /// Assembly buffer, `window_size * data_size` bytes, reused every window
    buffer: Vec<u8>,
    /// Payload length of each received slot
    lengths: Vec<usize>,
    state: ReceiverState,
    stats: ReceiverStats,
    progress: Option<ProgressFn>,
    recv_buf: Vec<u8>,
}

impl<T: Transport> Receiver<T> {
    /// Create a receiver over `transport`
    pub fn new(transport: T, config: ArqConfig) -> Result<Self, ReceiverError> {
        config.validate()?;

        Ok(Receiver {
            transport,
            window: WindowTracker::new(config.sequence_space()),
            buffer: vec![0u8; config.chunk_size()],
            lengths: vec![0; config.window_size as usize],
            recv_buf: vec![0u8; config.max_packet_size()],
            config,
            state: ReceiverState::Idle,
            stats: ReceiverStats::default(),
            progress: None,
        })
    }

    /// Report progress after every flushed window
    pub fn on_progress(mut self, progress: impl FnMut(u64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Base of the active window
    pub fn base(&self) -> WindowBase {
        self.window.base()
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Receive a whole transfer into `sink`
    pub fn receive<W: Write>(&mut self, sink: W) -> Result<ReceiverStats, ReceiverError> {
        match self.run(sink) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.set_state(ReceiverState::Fatal);
                tracing::error!("Transfer aborted at window {}: {}", self.window.base(), e);
                Err(e)
            }
        }
    }

    fn run<W: Write>(&mut self, mut sink: W) -> Result<ReceiverStats, ReceiverError> {
        self.transport.set_read_timeout(None)?;

        loop {
            let (expected, end_of_stream) = self.receive_window()?;
            self.flush_window(&mut sink, expected)?;

            self.set_state(ReceiverState::Advance);
            self.window.advance();
            self.lengths.iter_mut().for_each(|len| *len = 0);

            if end_of_stream {
                break;
            }
        }

        sink.flush().map_err(ReceiverError::Sink)?;
        self.set_state(ReceiverState::Done);
        tracing::info!(
            "Transfer complete: {} bytes in {} windows",
            self.stats.bytes_received,
            self.stats.windows_received
        );

        Ok(self.stats.clone())
    }

    /// Collect packets until the active window is complete
    ///
    /// Returns the number of slots the window holds and whether it carried
    /// the end-of-stream packet.
    fn receive_window(&mut self) -> Result<(usize, bool), ReceiverError> {
        let mut expected = self.window.capacity();
        let mut end_of_stream = false;

        while self.window.marked_count() < expected {
            self.set_state(ReceiverState::AwaitPackets);
            let len = match self.transport.recv(&mut self.recv_buf) {
                Ok(len) => len,
                Err(TransportError::Timeout) => continue,
                Err(e) => return Err(e.into()),
            };

            if let Some(end) = self.handle_datagram(len)? {
                tracing::debug!(
                    "End of stream in window {} at slot {}",
                    self.window.base(),
                    end - 1
                );
                expected = end;
                end_of_stream = true;
            }
        }

        Ok((expected, end_of_stream))
    }

    /// Accept the datagram in `recv_buf[..len]` if it is new, then ack it
    ///
    /// Returns the window's packet count when the datagram was an accepted
    /// end-of-stream packet.
    fn handle_datagram(&mut self, len: usize) -> Result<Option<usize>, ReceiverError> {
        let header = match PacketHeader::from_bytes(&self.recv_buf[..len]) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!("Dropping malformed datagram: {}", e);
                self.stats.malformed_datagrams += 1;
                return Ok(None);
            }
        };

        let mut end = None;
        match self.window.mark(header.seq) {
            MarkOutcome::New(slot) => {
                self.set_state(ReceiverState::Assemble);
                let payload = &self.recv_buf[HEADER_SIZE..len];
                let offset = slot * self.config.data_size;
                self.buffer[offset..offset + payload.len()].copy_from_slice(payload);
                self.lengths[slot] = payload.len();
                self.stats.packets_accepted += 1;

                if header.end_of_stream {
                    end = Some(slot + 1);
                }
            }
            MarkOutcome::Duplicate(slot) => {
                tracing::trace!("Duplicate packet {} (slot {})", header.seq, slot);
                self.stats.duplicate_packets += 1;
            }
            MarkOutcome::Stale => {
                tracing::trace!("Stale packet {}", header.seq);
                self.stats.stale_packets += 1;
            }
            MarkOutcome::Invalid => {
                tracing::warn!("Packet {} outside the sequence space", header.seq);
                self.stats.invalid_packets += 1;
            }
        }

        // Always ack, so a sender stuck on an older window can move on.
        self.transport.send(&AckPacket::new(header.seq).to_bytes())?;
        self.stats.acks_sent += 1;

        Ok(end)
    }

    /// Write the received slots of the completed window to `sink`
    fn flush_window<W: Write>(&mut self, sink: &mut W, expected: usize) -> Result<(), ReceiverError> {
        self.set_state(ReceiverState::Flush);

        let data_size = self.config.data_size;
        let mut written = 0u64;
        for slot in 0..expected {
            if !self.window.is_marked(slot) {
                continue;
            }
            let offset = slot * data_size;
            sink.write_all(&self.buffer[offset..offset + self.lengths[slot]])
                .map_err(ReceiverError::Sink)?;
            written += self.lengths[slot] as u64;
        }

        self.stats.bytes_received += written;
        self.stats.windows_received += 1;
        tracing::debug!(
            "Window {} complete: {} packets, {} bytes",
            self.window.base(),
            expected,
            written
        );

        let bytes_received = self.stats.bytes_received;
        if let Some(progress) = self.progress.as_mut() {
            progress(bytes_received);
        }

        Ok(())
    }

    fn set_state(&mut self, state: ReceiverState) {
        if self.state != state {
            tracing::trace!("Receiver state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}
