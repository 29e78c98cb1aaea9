//! Per-window slot tracking
//!
//! [`WindowTracker`] holds one flag per slot of the active window. The sender
//! uses it for "acknowledged", the receiver for "received"; both reset it at
//! the start of every window and advance the shared cursor exactly once per
//! completed window.

use crate::sequence::{SeqClass, SequenceSpace, WindowBase};

/// Result of marking a sequence number in the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// First sighting in this window; the slot is now marked
    New(usize),
    /// Slot was already marked in this window
    Duplicate(usize),
    /// Belongs to another window
    Stale,
    /// Outside the sequence space
    Invalid,
}

impl MarkOutcome {
    #[inline]
    pub fn is_new(&self) -> bool {
        matches!(self, MarkOutcome::New(_))
    }
}

/// Slot flags and cursor for the active window
#[derive(Debug, Clone)]
pub struct WindowTracker {
    space: SequenceSpace,
    base: WindowBase,
    flags: Vec<bool>,
    marked: usize,
}

impl WindowTracker {
    /// Create a tracker positioned at the first window
    pub fn new(space: SequenceSpace) -> Self {
        WindowTracker {
            space,
            base: WindowBase::ZERO,
            flags: vec![false; space.window_size() as usize],
            marked: 0,
        }
    }

    #[inline]
    pub fn space(&self) -> SequenceSpace {
        self.space
    }

    /// Lowest sequence number of the active window
    #[inline]
    pub fn base(&self) -> WindowBase {
        self.base
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.flags.len()
    }

    #[inline]
    pub fn slot(&self, seq: u8) -> usize {
        self.space.slot(seq)
    }

    #[inline]
    pub fn classify(&self, seq: u8) -> SeqClass {
        self.space.classify(self.base, seq)
    }

    /// Sequence number for `slot` in the active window
    #[inline]
    pub fn seq_at(&self, slot: usize) -> u8 {
        self.space.seq_at(self.base, slot)
    }

    /// Classify `seq` and, if it is current and unseen, mark its slot
    pub fn mark(&mut self, seq: u8) -> MarkOutcome {
        match self.classify(seq) {
            SeqClass::Current => {
                let slot = self.slot(seq);
                if self.flags[slot] {
                    MarkOutcome::Duplicate(slot)
                } else {
                    self.flags[slot] = true;
                    self.marked += 1;
                    MarkOutcome::New(slot)
                }
            }
            SeqClass::Stale => MarkOutcome::Stale,
            SeqClass::Invalid => MarkOutcome::Invalid,
        }
    }

    #[inline]
    pub fn is_marked(&self, slot: usize) -> bool {
        self.flags.get(slot).copied().unwrap_or(false)
    }

    /// Number of slots marked in the active window
    #[inline]
    pub fn marked_count(&self) -> usize {
        self.marked
    }

    /// Slots in `0..count` that are not yet marked
    pub fn unmarked(&self, count: usize) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .take(count)
            .enumerate()
            .filter(|(_, &marked)| !marked)
            .map(|(slot, _)| slot)
    }

    /// Clear all slot flags
    pub fn reset(&mut self) {
        self.flags.iter_mut().for_each(|flag| *flag = false);
        self.marked = 0;
    }

    /// Move to the next window and clear the flags
    pub fn advance(&mut self) {
        self.base = self.space.next_base(self.base);
        self.reset();
    }
}
