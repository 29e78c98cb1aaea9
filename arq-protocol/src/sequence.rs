//! Sequence Number Handling
//!
//! Sequence numbers are single bytes, but only a prefix of the byte range is
//! ever used: windows start at multiples of the window size from 0 up to a
//! configured maximum (100 by default), after which the cursor wraps back to 0.
//! With the default geometry the window bases cycle 0, 10, 20, ..., 100, 0, ...
//! and sequence numbers range over 0..=109.

use std::fmt;

/// Default window size (packets per window)
pub const DEFAULT_WINDOW_SIZE: u8 = 10;

/// Default largest window base before the cursor wraps to 0
pub const DEFAULT_MAX_START_SEQ: u8 = 100;

/// Lowest sequence number of a window
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct WindowBase(u8);

impl WindowBase {
    /// The base every transfer starts from
    pub const ZERO: WindowBase = WindowBase(0);

    #[inline]
    pub fn new(value: u8) -> Self {
        WindowBase(value)
    }

    /// Get the raw sequence number value
    #[inline]
    pub fn as_raw(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for WindowBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowBase({})", self.0)
    }
}

impl fmt::Display for WindowBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a sequence number falls relative to the active window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqClass {
    /// Inside `[base, base + W - 1]`
    Current,
    /// Outside the active window but inside the sequence space; assumed to
    /// belong to the previous window
    Stale,
    /// Never produced by a well-behaved peer
    Invalid,
}

/// Window geometry shared by both ends of a transfer
///
/// Both peers must be built from the same geometry, otherwise their window
/// cursors drift apart and classification breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpace {
    window_size: u8,
    max_start: u8,
}

impl SequenceSpace {
    /// Create a sequence space
    ///
    /// The caller guarantees `window_size > 0` and `max_start + window_size - 1 <= 255`;
    /// [`crate::ArqConfig::validate`] enforces both.
    pub fn new(window_size: u8, max_start: u8) -> Self {
        debug_assert!(window_size > 0);
        debug_assert!(max_start as usize + window_size as usize - 1 <= u8::MAX as usize);
        SequenceSpace {
            window_size,
            max_start,
        }
    }

    #[inline]
    pub fn window_size(&self) -> u8 {
        self.window_size
    }

    #[inline]
    pub fn max_start(&self) -> u8 {
        self.max_start
    }

    /// Largest sequence number the space can produce
    #[inline]
    pub fn max_seq(&self) -> u8 {
        self.max_start + (self.window_size - 1)
    }

    /// Window-relative index of a sequence number
    #[inline]
    pub fn slot(&self, seq: u8) -> usize {
        (seq % self.window_size) as usize
    }

    /// Sequence number occupying `slot` in the window starting at `base`
    #[inline]
    pub fn seq_at(&self, base: WindowBase, slot: usize) -> u8 {
        debug_assert!(slot < self.window_size as usize);
        base.0 + slot as u8
    }

    /// Last sequence number of the window starting at `base`
    #[inline]
    pub fn window_end(&self, base: WindowBase) -> u8 {
        base.0 + (self.window_size - 1)
    }

    /// Check whether `seq` belongs to the window starting at `base`
    #[inline]
    pub fn contains(&self, base: WindowBase, seq: u8) -> bool {
        seq >= base.0 && seq <= self.window_end(base)
    }

    /// Classify an incoming sequence number against the active window
    pub fn classify(&self, base: WindowBase, seq: u8) -> SeqClass {
        if self.contains(base, seq) {
            SeqClass::Current
        } else if seq > self.max_seq() {
            SeqClass::Invalid
        } else {
            SeqClass::Stale
        }
    }

    /// Base of the window following `base`
    pub fn next_base(&self, base: WindowBase) -> WindowBase {
        if base.0 >= self.max_start {
            WindowBase::ZERO
        } else {
            WindowBase(base.0 + self.window_size)
        }
    }
}

impl Default for SequenceSpace {
    fn default() -> Self {
        SequenceSpace::new(DEFAULT_WINDOW_SIZE, DEFAULT_MAX_START_SEQ)
    }
}
