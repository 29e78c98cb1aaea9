//! Protocol configuration
//!
//! The wire protocol was born with compile-time constants (10-packet windows,
//! 500-byte payloads, 100 ms ack timeout, 100 silent attempts, wrap at 100).
//! [`ArqConfig`] keeps those as defaults and validates any override.

use crate::packet::{DEFAULT_DATA_SIZE, HEADER_SIZE, MAX_DATAGRAM_SIZE};
use crate::sequence::{SequenceSpace, DEFAULT_MAX_START_SEQ, DEFAULT_WINDOW_SIZE};
use std::time::Duration;
use thiserror::Error;

/// Default per-attempt ack timeout
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Default number of consecutive silent ack attempts tolerated by the sender
pub const DEFAULT_MAX_SILENT_ATTEMPTS: u32 = 100;

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Window size must be at least 1")]
    ZeroWindow,

    #[error("Payload size must be between 1 and {max} bytes, got {size}")]
    DataSize { size: usize, max: usize },

    #[error("Ack timeout must be non-zero")]
    ZeroTimeout,

    #[error("Silence budget must allow at least one attempt")]
    ZeroSilenceBudget,

    #[error("Max start sequence {max_start} must be a multiple of the window size {window_size}")]
    MisalignedWrap { max_start: u8, window_size: u8 },

    #[error("Max start sequence {max_start} leaves room for only one window of {window_size}")]
    SingleWindow { max_start: u8, window_size: u8 },

    #[error("Sequence numbers up to {max_seq} do not fit in one byte")]
    SequenceOverflow { max_seq: usize },
}

/// ARQ protocol parameters
///
/// Both peers must agree on `window_size`, `data_size` and `max_start_seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArqConfig {
    /// Packets per window
    pub window_size: u8,
    /// Payload bytes per packet
    pub data_size: usize,
    /// Wait per ack-gathering attempt on the sender
    pub ack_timeout: Duration,
    /// Consecutive silent attempts before the sender gives up
    pub max_silent_attempts: u32,
    /// Largest window base before the cursor wraps to 0
    pub max_start_seq: u8,
}

impl Default for ArqConfig {
    fn default() -> Self {
        ArqConfig {
            window_size: DEFAULT_WINDOW_SIZE,
            data_size: DEFAULT_DATA_SIZE,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            max_silent_attempts: DEFAULT_MAX_SILENT_ATTEMPTS,
            max_start_seq: DEFAULT_MAX_START_SEQ,
        }
    }
}

impl ArqConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_size(mut self, window_size: u8) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_data_size(mut self, data_size: usize) -> Self {
        self.data_size = data_size;
        self
    }

    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    pub fn with_max_silent_attempts(mut self, attempts: u32) -> Self {
        self.max_silent_attempts = attempts;
        self
    }

    pub fn with_max_start_seq(mut self, max_start_seq: u8) -> Self {
        self.max_start_seq = max_start_seq;
        self
    }

    /// Check every parameter, returning the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        let max_data = MAX_DATAGRAM_SIZE - HEADER_SIZE;
        if self.data_size == 0 || self.data_size > max_data {
            return Err(ConfigError::DataSize {
                size: self.data_size,
                max: max_data,
            });
        }

        if self.ack_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.max_silent_attempts == 0 {
            return Err(ConfigError::ZeroSilenceBudget);
        }

        if self.max_start_seq % self.window_size != 0 {
            return Err(ConfigError::MisalignedWrap {
                max_start: self.max_start_seq,
                window_size: self.window_size,
            });
        }

        // Stale detection needs at least two distinct windows in the cycle.
        if self.max_start_seq < self.window_size {
            return Err(ConfigError::SingleWindow {
                max_start: self.max_start_seq,
                window_size: self.window_size,
            });
        }

        let max_seq = self.max_start_seq as usize + self.window_size as usize - 1;
        if max_seq > u8::MAX as usize {
            return Err(ConfigError::SequenceOverflow { max_seq });
        }

        Ok(())
    }

    /// Window geometry; only meaningful once [`validate`](Self::validate) passed
    pub fn sequence_space(&self) -> SequenceSpace {
        SequenceSpace::new(self.window_size, self.max_start_seq)
    }

    /// Bytes read from the source per window
    pub fn chunk_size(&self) -> usize {
        self.window_size as usize * self.data_size
    }

    /// Largest data packet on the wire
    pub fn max_packet_size(&self) -> usize {
        HEADER_SIZE + self.data_size
    }
}
