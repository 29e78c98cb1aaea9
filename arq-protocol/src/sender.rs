//! Sender engine
//!
//! Drives a transfer window by window:
//!
//! ```text
//!  Idle ─▶ ReadChunk ─▶ Transmit ─▶ AwaitAcks ─┬─▶ Advance ─▶ ReadChunk ...
//!                          ▲                   │
//!                          └──── unacked ──────┘
//! ```
//!
//! Each window is sent in rounds. The first round sends every packet, later
//! rounds only the slots still unacknowledged. A round ends when one ack
//! attempt times out. Attempts that see no datagram at all count against a
//! silence budget that persists for the whole transfer; exhausting it aborts.

use crate::config::{ArqConfig, ConfigError};
use crate::packet::{self, AckPacket, HEADER_SIZE};
use crate::sequence::WindowBase;
use crate::stream::{Chunk, ChunkReader};
use crate::transport::{Transport, TransportError};
use crate::window::{MarkOutcome, WindowTracker};
use bytes::Bytes;
use std::io::{self, Read};
use thiserror::Error;

/// Sender state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Created, nothing sent yet
    Idle,
    /// Pulling the next chunk from the source
    ReadChunk,
    /// Sending the unacknowledged packets of the window
    Transmit,
    /// Gathering acks for the current round
    AwaitAcks,
    /// Window fully acknowledged, moving the cursor
    Advance,
    /// Source exhausted and every window acknowledged
    Done,
    /// Transfer aborted
    Fatal,
}

/// Sender errors; all of them abort the transfer
#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Receiver not responding after {attempts} silent ack attempts")]
    UnresponsivePeer { attempts: u32 },

    #[error("Source read failed: {0}")]
    Source(#[source] io::Error),
}

/// Sender statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Payload bytes delivered
    pub bytes_sent: u64,
    /// Windows fully acknowledged
    pub windows_sent: u64,
    /// Data packets put on the wire, retransmissions included
    pub packets_sent: u64,
    /// Data packets sent again after a round
    pub packets_retransmitted: u64,
    /// Ack datagrams received
    pub acks_received: u64,
    /// Acks for slots already acknowledged
    pub duplicate_acks: u64,
    /// Acks for another window
    pub stale_acks: u64,
    /// Acks outside the sequence space
    pub invalid_acks: u64,
    /// Ack attempts that timed out without any datagram
    pub silent_attempts: u64,
}

/// Progress callback, invoked with the running byte count after every window
pub type ProgressFn = Box<dyn FnMut(u64) + Send>;

/// Selective-repeat sender for one transfer
pub struct Sender<T> {
    transport: T,
    config: ArqConfig,
    window: WindowTracker,
    /// Consecutive silent attempts; survives window boundaries
    silent_attempts: u32,
    state: SenderState,
    stats: SenderStats,
    progress: Option<ProgressFn>,
    recv_buf: Vec<u8>,
}

impl<T: Transport> Sender<T> {
    /// Create a sender over `transport`
    pub fn new(transport: T, config: ArqConfig) -> Result<Self, SenderError> {
        config.validate()?;

        Ok(Sender {
            transport,
            window: WindowTracker::new(config.sequence_space()),
            recv_buf: vec![0u8; config.max_packet_size()],
            config,
            silent_attempts: 0,
            state: SenderState::Idle,
            stats: SenderStats::default(),
            progress: None,
        })
    }

    /// Report progress after every acknowledged window
    pub fn on_progress(mut self, progress: impl FnMut(u64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Base of the active window
    pub fn base(&self) -> WindowBase {
        self.window.base()
    }

    /// Current run of consecutive silent ack attempts
    pub fn silent_attempts(&self) -> u32 {
        self.silent_attempts
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send everything `source` yields, returning once the last window is acknowledged
    pub fn send<R: Read>(&mut self, source: R) -> Result<SenderStats, SenderError> {
        match self.run(source) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.set_state(SenderState::Fatal);
                tracing::error!("Transfer aborted at window {}: {}", self.window.base(), e);
                Err(e)
            }
        }
    }

    fn run<R: Read>(&mut self, source: R) -> Result<SenderStats, SenderError> {
        self.transport
            .set_read_timeout(Some(self.config.ack_timeout))?;

        let mut reader = ChunkReader::new(source, self.config.chunk_size());

        self.set_state(SenderState::ReadChunk);
        let mut next = reader.next_chunk().map_err(SenderError::Source)?;
        if next.is_none() {
            // An empty source still owes the receiver an end-of-stream marker.
            next = Some(Chunk {
                data: Bytes::new(),
                is_final: true,
            });
        }

        while let Some(chunk) = next {
            self.send_window(&chunk)?;
            self.stats.bytes_sent += chunk.data.len() as u64;
            self.stats.windows_sent += 1;

            let bytes_sent = self.stats.bytes_sent;
            if let Some(progress) = self.progress.as_mut() {
                progress(bytes_sent);
            }

            self.set_state(SenderState::Advance);
            self.window.advance();

            self.set_state(SenderState::ReadChunk);
            next = reader.next_chunk().map_err(SenderError::Source)?;
        }

        self.set_state(SenderState::Done);
        tracing::info!(
            "Transfer complete: {} bytes in {} windows ({} retransmissions)",
            self.stats.bytes_sent,
            self.stats.windows_sent,
            self.stats.packets_retransmitted
        );

        Ok(self.stats.clone())
    }

    /// Carve a chunk into encoded packets, one per slot
    fn build_packets(&self, chunk: &Chunk) -> Vec<Bytes> {
        let data_size = self.config.data_size;
        let len = chunk.data.len();

        if len == 0 {
            return vec![packet::encode(self.window.seq_at(0), true, &[]).freeze()];
        }

        let count = (len + data_size - 1) / data_size;
        let mut packets = Vec::with_capacity(count);
        let mut offset = 0;

        for slot in 0..count {
            let is_last = slot + 1 == count;
            let payload_len = packet::packet_size(len, is_last, data_size) - HEADER_SIZE;
            let payload = &chunk.data[offset..offset + payload_len];
            offset += payload_len;

            let end_of_stream = is_last && chunk.is_final;
            packets.push(packet::encode(self.window.seq_at(slot), end_of_stream, payload).freeze());
        }

        packets
    }

    /// Send one window until every packet in it is acknowledged
    fn send_window(&mut self, chunk: &Chunk) -> Result<(), SenderError> {
        let packets = self.build_packets(chunk);
        let count = packets.len();
        let mut round = 0u32;

        tracing::debug!(
            "Sending window {} ({} packets, {} bytes{})",
            self.window.base(),
            count,
            chunk.data.len(),
            if chunk.is_final { ", final" } else { "" }
        );

        loop {
            let pending: Vec<usize> = self.window.unmarked(count).collect();
            if pending.is_empty() {
                break;
            }

            round += 1;
            if round > 1 {
                tracing::debug!(
                    "Window {} round {}: retransmitting {} packets",
                    self.window.base(),
                    round,
                    pending.len()
                );
                self.stats.packets_retransmitted += pending.len() as u64;
            }

            self.set_state(SenderState::Transmit);
            for slot in pending {
                self.transport.send(&packets[slot])?;
                self.stats.packets_sent += 1;
            }

            self.set_state(SenderState::AwaitAcks);
            let new_acks = self.await_acks()?;
            tracing::trace!(
                "Window {} round {}: {} new acks, {}/{} acknowledged",
                self.window.base(),
                round,
                new_acks,
                self.window.marked_count(),
                count
            );
        }

        tracing::debug!(
            "Window {} acknowledged after {} rounds",
            self.window.base(),
            round
        );
        Ok(())
    }

    /// One ack-gathering attempt: receive until the read timeout expires
    ///
    /// Returns the number of newly acknowledged slots.
    fn await_acks(&mut self) -> Result<usize, SenderError> {
        let mut new_acks = 0;
        let mut received_any = false;

        loop {
            let len = match self.transport.recv(&mut self.recv_buf) {
                Ok(len) => len,
                Err(TransportError::Timeout) => break,
                Err(e) => return Err(e.into()),
            };

            received_any = true;
            self.silent_attempts = 0;

            let ack = match AckPacket::from_bytes(&self.recv_buf[..len]) {
                Ok(ack) => ack,
                Err(e) => {
                    tracing::warn!("Dropping malformed ack: {}", e);
                    continue;
                }
            };
            self.stats.acks_received += 1;

            match self.window.mark(ack.seq) {
                MarkOutcome::New(_) => new_acks += 1,
                MarkOutcome::Duplicate(_) => self.stats.duplicate_acks += 1,
                MarkOutcome::Stale => {
                    tracing::trace!("Ignoring stale {}", ack);
                    self.stats.stale_acks += 1;
                }
                MarkOutcome::Invalid => {
                    tracing::warn!("Ignoring {} outside the sequence space", ack);
                    self.stats.invalid_acks += 1;
                }
            }
        }

        if !received_any {
            self.silent_attempts += 1;
            self.stats.silent_attempts += 1;

            if self.silent_attempts > self.config.max_silent_attempts {
                return Err(SenderError::UnresponsivePeer {
                    attempts: self.silent_attempts,
                });
            }
        }

        Ok(new_acks)
    }

    fn set_state(&mut self, state: SenderState) {
        if self.state != state {
            tracing::trace!("Sender state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use std::collections::HashSet;
    use std::io::Cursor;
    use std::time::Duration;

    /// Acks every data packet it sees
    fn ack_all() -> ScriptedTransport {
        ScriptedTransport::with_responder(|datagram| vec![vec![datagram[0]]])
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = Sender::new(ScriptedTransport::new(), ArqConfig::new().with_window_size(0));
        assert!(matches!(result, Err(SenderError::Config(ConfigError::ZeroWindow))));
    }

    #[test]
    fn test_configures_ack_timeout() {
        let mut sender = Sender::new(ack_all(), ArqConfig::default()).unwrap();
        sender.send(Cursor::new(payload(10))).unwrap();

        let transport = sender.into_transport();
        assert_eq!(transport.read_timeout(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_exact_window_flags_tenth_packet() {
        let mut sender = Sender::new(ack_all(), ArqConfig::default()).unwrap();
        let stats = sender.send(Cursor::new(payload(5000))).unwrap();

        assert_eq!(sender.state(), SenderState::Done);
        assert_eq!(stats.bytes_sent, 5000);
        assert_eq!(stats.windows_sent, 1);

        let transport = sender.into_transport();
        assert_eq!(transport.sent.len(), 10);
        for (i, datagram) in transport.sent.iter().enumerate() {
            assert_eq!(datagram.len(), 502);
            assert_eq!(datagram[0], i as u8);
            assert_eq!(datagram[1], u8::from(i == 9));
        }
    }

    #[test]
    fn test_one_byte_spill_window() {
        let mut sender = Sender::new(ack_all(), ArqConfig::default()).unwrap();
        let stats = sender.send(Cursor::new(payload(5001))).unwrap();
        assert_eq!(stats.windows_sent, 2);

        let transport = sender.into_transport();
        assert_eq!(transport.sent.len(), 11);
        assert!(transport.sent[..10].iter().all(|d| d.len() == 502 && d[1] == 0));

        let last = &transport.sent[10];
        assert_eq!(last.len(), HEADER_SIZE + 1);
        assert_eq!(last[0], 10);
        assert_eq!(last[1], 1);
        assert_eq!(last[2], payload(5001)[5000]);
    }

    #[test]
    fn test_empty_source_sends_end_marker() {
        let mut sender = Sender::new(ack_all(), ArqConfig::default()).unwrap();
        let stats = sender.send(Cursor::new(Vec::new())).unwrap();
        assert_eq!(stats.bytes_sent, 0);

        let transport = sender.into_transport();
        assert_eq!(transport.sent, vec![vec![0u8, 1u8]]);
    }

    #[test]
    fn test_retransmits_only_unacked_slots() {
        let mut dropped: HashSet<u8> = [3u8, 6].into_iter().collect();
        let transport = ScriptedTransport::with_responder(move |datagram| {
            // Lose the first copy of 3 and 6.
            if dropped.remove(&datagram[0]) {
                Vec::new()
            } else {
                vec![vec![datagram[0]]]
            }
        });

        let mut sender = Sender::new(transport, ArqConfig::default()).unwrap();
        let stats = sender.send(Cursor::new(payload(5000))).unwrap();
        assert_eq!(stats.packets_retransmitted, 2);
        assert_eq!(stats.packets_sent, 12);

        let transport = sender.into_transport();
        let seqs = transport.sent_seqs();
        assert_eq!(&seqs[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(&seqs[10..], &[3, 6]);
    }

    #[test]
    fn test_duplicate_acks_count_once() {
        let transport = ScriptedTransport::with_responder(|datagram| {
            if datagram[0] == 9 {
                // Ack 9 but repeat an earlier ack instead of acking itself twice.
                vec![vec![0], vec![0], vec![9]]
            } else if datagram[0] == 0 {
                vec![vec![0], vec![0]]
            } else {
                vec![vec![datagram[0]]]
            }
        });

        let mut sender = Sender::new(transport, ArqConfig::default()).unwrap();
        let stats = sender.send(Cursor::new(payload(5000))).unwrap();

        assert_eq!(stats.acks_received, 13);
        assert_eq!(stats.duplicate_acks, 3);
        assert_eq!(stats.packets_retransmitted, 0);
    }

    #[test]
    fn test_stale_and_invalid_acks_ignored() {
        let transport = ScriptedTransport::with_responder(|datagram| {
            // Every packet of the second window draws an old ack and a bogus one first.
            if datagram[0] >= 10 {
                vec![vec![datagram[0] - 10], vec![250], vec![datagram[0]]]
            } else {
                vec![vec![datagram[0]]]
            }
        });

        let mut sender = Sender::new(transport, ArqConfig::default()).unwrap();
        let stats = sender.send(Cursor::new(payload(7500))).unwrap();

        assert_eq!(stats.windows_sent, 2);
        assert_eq!(stats.stale_acks, 5);
        assert_eq!(stats.invalid_acks, 5);
        assert_eq!(stats.packets_retransmitted, 0);
    }

    #[test]
    fn test_silent_peer_is_fatal() {
        let config = ArqConfig::default().with_max_silent_attempts(100);
        let mut sender = Sender::new(ScriptedTransport::new(), config).unwrap();

        let err = sender.send(Cursor::new(payload(10))).unwrap_err();
        assert!(matches!(err, SenderError::UnresponsivePeer { attempts: 101 }));
        assert_eq!(sender.state(), SenderState::Fatal);

        let transport = sender.into_transport();
        assert_eq!(transport.timeouts, 101);
        assert_eq!(transport.sent.len(), 101);
    }

    #[test]
    fn test_any_datagram_resets_silence() {
        let mut rounds = 0u32;
        let transport = ScriptedTransport::with_responder(move |datagram| {
            rounds += 1;
            // Stay quiet for 3 rounds, then answer with an unrelated ack, repeat;
            // finally ack for real.
            match rounds {
                n if n < 40 && n % 4 != 0 => Vec::new(),
                n if n < 40 => vec![vec![200]],
                _ => vec![vec![datagram[0]]],
            }
        });

        let config = ArqConfig::default().with_max_silent_attempts(3);
        let mut sender = Sender::new(transport, config).unwrap();
        let stats = sender.send(Cursor::new(payload(10))).unwrap();

        assert_eq!(stats.invalid_acks, 9);
        assert_eq!(stats.silent_attempts, 30);
        assert_eq!(sender.silent_attempts(), 0);
    }

    #[test]
    fn test_silence_budget_spans_windows() {
        let mut nines = 0u32;
        let transport = ScriptedTransport::with_responder(move |datagram| match datagram[0] {
            // The last packet of window 0 goes unanswered four times.
            9 => {
                nines += 1;
                if nines > 4 {
                    vec![vec![9]]
                } else {
                    Vec::new()
                }
            }
            10 => Vec::new(),
            seq => vec![vec![seq]],
        });

        let config = ArqConfig::default().with_max_silent_attempts(3);
        let mut sender = Sender::new(transport, config).unwrap();
        let err = sender.send(Cursor::new(payload(5100))).unwrap_err();

        // Window 0 spent the whole budget, but its closing ack cleared it, so
        // window 1 gets the full budget plus one before giving up.
        assert!(matches!(err, SenderError::UnresponsivePeer { attempts: 4 }));
        assert_eq!(sender.stats().windows_sent, 1);
        assert_eq!(sender.stats().silent_attempts, 7);
        assert_eq!(sender.base(), WindowBase::new(10));

        let transport = sender.into_transport();
        let seqs = transport.sent_seqs();
        assert_eq!(seqs.iter().filter(|&&s| s == 9).count(), 5);
        assert_eq!(&seqs[14..], &[10, 10, 10, 10]);
    }

    #[test]
    fn test_progress_reports_per_window() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sender = Sender::new(ack_all(), ArqConfig::default())
            .unwrap()
            .on_progress(move |bytes| {
                let _ = tx.send(bytes);
            });

        sender.send(Cursor::new(payload(12_345))).unwrap();
        let seen: Vec<u64> = rx.try_iter().collect();
        assert_eq!(seen, vec![5000, 10_000, 12_345]);
    }
}
